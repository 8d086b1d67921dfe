// Copyright 2025 Justin Hu
//
// This file is part of Iron Front.
//
// Iron Front is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Iron Front is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with Iron Front. If not, see <https://www.gnu.org/licenses/>.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-connection state and the socket pump

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    net::SocketAddr,
};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use iron_front_common::{
    PlayerId,
    message::{ClientMessage, ClientMessageKind, GameId, ServerMessage},
    player::PlayerPhase,
};
use serde_cbor::{from_slice, to_vec};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use crate::server::{SharedServer, lock};

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u32);

impl From<u32> for SessionId {
    fn from(value: u32) -> Self {
        SessionId(value)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "session {}", self.0)
    }
}

/// Queued for the send task
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Message(ServerMessage),
    /// Flush and close the socket
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    LoggedIn,
    WaitingForOpponent,
    InGame(PlayerPhase),
}

impl SessionState {
    /// Messages accepted in this state
    pub fn whitelist(self) -> &'static [ClientMessageKind] {
        use ClientMessageKind::*;

        match self {
            SessionState::Connected => &[Login, Error],
            SessionState::LoggedIn => &[
                CreateGame,
                ViewPublicGames,
                JoinPublicGame,
                JoinPrivateGame,
                Error,
            ],
            SessionState::WaitingForOpponent => &[CancelGame, Error],
            SessionState::InGame(PlayerPhase::DeployingUnits | PlayerPhase::HasDeployedUnits) => {
                &[InitialDeployment, Surrender, Error]
            }
            SessionState::InGame(PlayerPhase::MyTurn) => &[
                MoveUnit,
                EntrenchUnit,
                AttackUnit,
                DeployUnit,
                ReinforceUnit,
                PurchaseUnit,
                UpgradeUnit,
                EndTurn,
                Surrender,
                Error,
            ],
            SessionState::InGame(PlayerPhase::OpponentTurn) => &[Surrender, Error],
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub name: Option<String>,
    /// Game and seat, from creating an offer until the game ends
    pub game: Option<(GameId, PlayerId)>,
    state: SessionState,
    allowed: HashSet<ClientMessageKind>,
    outbox: UnboundedSender<Outgoing>,
    shutting_down: bool,
}

impl Session {
    pub fn new(id: SessionId, outbox: UnboundedSender<Outgoing>) -> Self {
        let state = SessionState::Connected;
        Self {
            id,
            name: None,
            game: None,
            state,
            allowed: state.whitelist().iter().copied().collect(),
            outbox,
            shutting_down: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn set_state(&mut self, state: SessionState) {
        if state != self.state {
            debug!(session = %self.id, ?state, "state change");
        }
        self.state = state;
        self.allowed = state.whitelist().iter().copied().collect();
    }

    pub fn allows(&self, kind: ClientMessageKind) -> bool {
        self.allowed.contains(&kind)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Queue a message; dropped once the session is shutting down
    pub fn send(&self, message: ServerMessage) {
        if self.shutting_down {
            return;
        }
        if self.outbox.send(Outgoing::Message(message)).is_err() {
            debug!(session = %self.id, "send task has already exited");
        }
    }

    /// Stop accepting messages and close the socket once the queue drains
    pub fn shut_down(&mut self) {
        if !self.shutting_down {
            self.shutting_down = true;
            if self.outbox.send(Outgoing::Close).is_err() {
                debug!(session = %self.id, "send task has already exited");
            }
        }
    }
}

/// Pump one WebSocket until either side hangs up
pub async fn handle_socket(socket: WebSocket, server: SharedServer, address: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut inbox) = unbounded_channel();
    let id = lock(&server).connect(outbox);
    info!(session = %id, %address, "connected");

    let send_task = tokio::spawn(async move {
        while let Some(Outgoing::Message(message)) = inbox.recv().await {
            let bytes = match to_vec(&message) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(session = %id, "couldn't encode message: {e}");
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Binary(bytes.into())).await {
                debug!(session = %id, "couldn't send: {e}");
                break;
            }
        }
        if let Err(e) = sender.close().await {
            debug!(session = %id, "couldn't close socket: {e}");
        }
    });

    while let Some(frame) = receiver.next().await {
        let bytes = match frame {
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(session = %id, "couldn't receive: {e}");
                break;
            }
        };
        let message = from_slice::<ClientMessage>(&bytes);
        let open = {
            let mut server = lock(&server);
            match message {
                Ok(message) => server.process_message(id, message),
                Err(e) => {
                    server.reject(id, format!("malformed message: {e}"));
                    false
                }
            }
        };
        if !open {
            break;
        }
    }

    lock(&server).on_client_termination(id);
    if let Err(e) = send_task.await {
        warn!(session = %id, "send task failed: {e}");
    }
    info!(session = %id, "disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_always_allowed() {
        for state in [
            SessionState::Connected,
            SessionState::LoggedIn,
            SessionState::WaitingForOpponent,
            SessionState::InGame(PlayerPhase::DeployingUnits),
            SessionState::InGame(PlayerPhase::HasDeployedUnits),
            SessionState::InGame(PlayerPhase::MyTurn),
            SessionState::InGame(PlayerPhase::OpponentTurn),
        ] {
            assert!(state.whitelist().contains(&ClientMessageKind::Error));
        }
    }

    #[test]
    fn orders_only_on_own_turn() {
        let (outbox, _inbox) = unbounded_channel();
        let mut session = Session::new(SessionId::from(1), outbox);
        assert!(session.allows(ClientMessageKind::Login));
        assert!(!session.allows(ClientMessageKind::MoveUnit));

        session.set_state(SessionState::InGame(PlayerPhase::OpponentTurn));
        assert!(!session.allows(ClientMessageKind::MoveUnit));
        assert!(!session.allows(ClientMessageKind::EndTurn));
        assert!(session.allows(ClientMessageKind::Surrender));

        session.set_state(SessionState::InGame(PlayerPhase::MyTurn));
        assert!(session.allows(ClientMessageKind::MoveUnit));
        assert!(!session.allows(ClientMessageKind::InitialDeployment));
    }

    #[test]
    fn nothing_is_sent_after_shutdown() {
        let (outbox, mut inbox) = unbounded_channel();
        let mut session = Session::new(SessionId::from(1), outbox);
        session.send(ServerMessage::GameCancelled);
        session.shut_down();
        session.shut_down();
        session.send(ServerMessage::GameCancelled);

        assert_eq!(
            inbox.try_recv(),
            Ok(Outgoing::Message(ServerMessage::GameCancelled))
        );
        assert_eq!(inbox.try_recv(), Ok(Outgoing::Close));
        assert!(inbox.try_recv().is_err());
        assert!(session.is_shutting_down());
    }

    #[test]
    fn shutting_down_after_the_socket_is_gone() {
        let (outbox, inbox) = unbounded_channel();
        let mut session = Session::new(SessionId::from(1), outbox);
        drop(inbox);
        session.shut_down();
        session.send(ServerMessage::GameCancelled);
        assert!(session.is_shutting_down());
    }
}

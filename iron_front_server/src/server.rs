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

//! Sessions, the lobby and message dispatch
//!
//! Everything that touches a game goes through [`Server`] while holding its
//! mutex; there is one lock for the whole process

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use iron_front_common::{
    IdGenerator, PlayerId,
    error::GameError,
    game::{Game, GameConfiguration, GameEnd, GameOutcome},
    message::{
        BaseArmy, ClientMessage, ClientMessageKind, GameId, JoinGameResult, LoginResult,
        PROTOCOL_VERSION, PublicGame, ServerMessage,
    },
};
use rand::{Rng, SeedableRng, rng};
use rand_pcg::Pcg64;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::Content,
    game::ServerGame,
    session::{Outgoing, Session, SessionId, SessionState},
    timer::{TimerKind, TimerRequest},
};

pub type SharedServer = Arc<Mutex<Server>>;

/// Take the global lock
///
/// A handler that panicked while holding the lock may have left a game half
/// updated, so every later caller panics too
pub fn lock(server: &SharedServer) -> MutexGuard<'_, Server> {
    server.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        error!("server state was poisoned by an earlier panic");
        panic!("{poisoned}")
    })
}

pub struct Server {
    pub(crate) content: Content,
    max_name_length: usize,
    pub(crate) sessions: HashMap<SessionId, Session>,
    session_ids: IdGenerator<SessionId, u32>,
    pub(crate) games: HashMap<GameId, ServerGame>,
    game_ids: IdGenerator<GameId, u32>,
    public_games: BTreeSet<GameId>,
    private_games: HashMap<String, GameId>,
    timers: UnboundedSender<TimerRequest>,
}

impl Server {
    pub fn new(
        content: Content,
        max_name_length: usize,
        timers: UnboundedSender<TimerRequest>,
    ) -> Self {
        Self {
            content,
            max_name_length,
            sessions: HashMap::new(),
            session_ids: IdGenerator::default(),
            games: HashMap::new(),
            game_ids: IdGenerator::default(),
            public_games: BTreeSet::new(),
            private_games: HashMap::new(),
            timers,
        }
    }

    /// Register a new connection
    pub fn connect(&mut self, outbox: UnboundedSender<Outgoing>) -> SessionId {
        let id = self.session_ids.next().expect("should be infinite");
        self.sessions.insert(id, Session::new(id, outbox));
        id
    }

    pub(crate) fn send(&self, id: SessionId, message: ServerMessage) {
        if let Some(session) = self.sessions.get(&id) {
            session.send(message);
        }
    }

    /// Tell a client what it did wrong and hang up on it
    pub fn reject(&mut self, id: SessionId, message: String) {
        warn!(session = %id, "rejected: {message}");
        if let Some(session) = self.sessions.get_mut(&id) {
            session.send(ServerMessage::Error { message });
            session.shut_down();
        }
    }

    pub(crate) fn request_timer(&self, game: GameId, timer: TimerKind, seconds: u32) {
        let request = TimerRequest {
            game,
            timer,
            after: Duration::from_secs(seconds.into()),
        };
        if self.timers.send(request).is_err() {
            warn!(%game, ?timer, "timer service is gone");
        }
    }

    /// Handle one message from a client
    ///
    /// Returns whether the connection should stay open
    pub fn process_message(&mut self, id: SessionId, message: ClientMessage) -> bool {
        let Some(session) = self.sessions.get(&id) else {
            return false;
        };
        if session.is_shutting_down() {
            return false;
        }
        let kind = ClientMessageKind::from(&message);
        if !session.allows(kind) {
            debug!(session = %id, ?kind, state = ?session.state(), "ignoring out of state message");
            return true;
        }
        if let ClientMessage::Error { message } = &message {
            warn!(session = %id, "client reported an error: {message}");
            if let Some(session) = self.sessions.get_mut(&id) {
                session.shut_down();
            }
            return false;
        }

        match self.dispatch(id, message) {
            Ok(()) => true,
            Err(e) => {
                self.reject(id, e.to_string());
                false
            }
        }
    }

    fn dispatch(&mut self, id: SessionId, message: ClientMessage) -> Result<(), GameError> {
        match message {
            ClientMessage::Login { version, name } => {
                self.login(id, version, name);
                Ok(())
            }
            ClientMessage::CreateGame {
                configuration,
                army,
                private,
            } => self.create_game(id, configuration, &army, private),
            ClientMessage::ViewPublicGames => {
                self.view_public_games(id);
                Ok(())
            }
            ClientMessage::JoinPublicGame { game, army } => {
                let game = self.public_games.contains(&game).then_some(game);
                self.join_game(id, game, &army)
            }
            ClientMessage::JoinPrivateGame { key, army } => {
                let game = self.private_games.get(&key).copied();
                self.join_game(id, game, &army)
            }
            ClientMessage::CancelGame => {
                self.cancel_game(id);
                Ok(())
            }
            ClientMessage::InitialDeployment {
                units,
                requested_first_turn,
            } => self.initial_deployment(id, &units, requested_first_turn),
            ClientMessage::MoveUnit { unit, destination } => {
                self.move_unit(id, unit, destination)
            }
            ClientMessage::EntrenchUnit { unit } => self.entrench_unit(id, unit),
            ClientMessage::AttackUnit { attacker, defender } => {
                self.attack_unit(id, attacker, defender)
            }
            ClientMessage::DeployUnit { unit, position } => self.deploy_unit(id, unit, position),
            ClientMessage::ReinforceUnit { unit } => self.reinforce_unit(id, unit),
            ClientMessage::PurchaseUnit { unit } => self.purchase_unit(id, &unit),
            ClientMessage::UpgradeUnit { unit, upgrade } => self.upgrade_unit(id, unit, upgrade),
            ClientMessage::EndTurn => {
                self.end_turn(id);
                Ok(())
            }
            ClientMessage::Surrender => {
                self.surrender(id);
                Ok(())
            }
            ClientMessage::Error { .. } => unreachable!("client errors are handled before dispatch"),
        }
    }

    fn login(&mut self, id: SessionId, version: u32, name: String) {
        let result = if version != PROTOCOL_VERSION {
            LoginResult::WrongVersion
        } else if name.trim().is_empty() {
            LoginResult::EmptyName
        } else if name.chars().count() > self.max_name_length {
            LoginResult::NameTooLong
        } else if self
            .sessions
            .values()
            .any(|session| session.name.as_deref() == Some(name.as_str()))
        {
            LoginResult::NameTaken
        } else {
            LoginResult::Success {
                factions: self.content.factions.clone(),
                maps: self.content.maps.keys().cloned().collect(),
            }
        };

        if let Some(session) = self.sessions.get_mut(&id) {
            if matches!(result, LoginResult::Success { .. }) {
                info!(session = %id, %name, "logged in");
                session.name = Some(name);
                session.set_state(SessionState::LoggedIn);
            } else {
                debug!(session = %id, ?result, "login refused");
            }
            session.send(ServerMessage::LoginReply(result));
        }
    }

    fn create_game(
        &mut self,
        id: SessionId,
        configuration: GameConfiguration,
        army: &BaseArmy,
        private: bool,
    ) -> Result<(), GameError> {
        configuration.validate()?;
        let map = self
            .content
            .maps
            .get(&configuration.map)
            .ok_or(GameError::NoSuchMap)?
            .clone();
        let mut game = Game::new(configuration, map, Pcg64::from_seed(rng().random()));
        game.create_army(PlayerId::Player1, &self.content.factions, army)?;

        let game_id = self.game_ids.next().expect("should be infinite");
        let private_key = private.then(|| Uuid::new_v4().to_string());
        match &private_key {
            Some(key) => {
                self.private_games.insert(key.clone(), game_id);
            }
            None => {
                self.public_games.insert(game_id);
            }
        }
        self.games.insert(
            game_id,
            ServerGame {
                game,
                sessions: [Some(id), None],
                private_key: private_key.clone(),
            },
        );
        info!(session = %id, game = %game_id, private, "game offered");

        if let Some(session) = self.sessions.get_mut(&id) {
            session.game = Some((game_id, PlayerId::Player1));
            session.set_state(SessionState::WaitingForOpponent);
            session.send(ServerMessage::CreateGameReply { private_key });
        }
        Ok(())
    }

    fn view_public_games(&self, id: SessionId) {
        let games = self
            .public_games
            .iter()
            .filter_map(|game_id| {
                let game = self.games.get(game_id)?;
                let owner = game.sessions[PlayerId::Player1.index()]
                    .and_then(|owner| self.sessions.get(&owner))
                    .and_then(|owner| owner.name.clone())
                    .unwrap_or_default();
                Some(PublicGame {
                    id: *game_id,
                    owner,
                    configuration: game.game.configuration.clone(),
                })
            })
            .collect();
        self.send(id, ServerMessage::PublicGames(games));
    }

    fn join_game(
        &mut self,
        id: SessionId,
        game_id: Option<GameId>,
        army: &BaseArmy,
    ) -> Result<(), GameError> {
        let Some((game_id, server_game)) = game_id.and_then(|game_id| {
            self.games
                .get_mut(&game_id)
                .map(|server_game| (game_id, server_game))
        }) else {
            self.send(id, ServerMessage::JoinGameReply(JoinGameResult::NoSuchGame));
            return Ok(());
        };
        server_game
            .game
            .create_army(PlayerId::Player2, &self.content.factions, army)?;
        server_game.sessions[PlayerId::Player2.index()] = Some(id);
        self.remove_offer(game_id);

        if let Some(session) = self.sessions.get_mut(&id) {
            session.game = Some((game_id, PlayerId::Player2));
            session.send(ServerMessage::JoinGameReply(JoinGameResult::Success));
        }
        info!(session = %id, game = %game_id, "game joined");
        self.on_opponent_found(game_id);
        Ok(())
    }

    fn remove_offer(&mut self, game_id: GameId) {
        self.public_games.remove(&game_id);
        if let Some(key) = self
            .games
            .get(&game_id)
            .and_then(|game| game.private_key.as_ref())
        {
            self.private_games.remove(key);
        }
    }

    fn cancel_game(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        let Some((game_id, _)) = session.game.take() else {
            return;
        };
        session.set_state(SessionState::LoggedIn);
        session.send(ServerMessage::GameCancelled);
        self.remove_offer(game_id);
        self.games.remove(&game_id);
        info!(session = %id, game = %game_id, "offer withdrawn");
    }

    /// A connection is gone; deserting a game forfeits it
    pub fn on_client_termination(&mut self, id: SessionId) {
        let Some(session) = self.sessions.remove(&id) else {
            return;
        };
        let Some((game_id, player)) = session.game else {
            return;
        };
        match session.state() {
            SessionState::WaitingForOpponent => {
                self.remove_offer(game_id);
                self.games.remove(&game_id);
                info!(session = %id, game = %game_id, "offer withdrawn on disconnect");
            }
            _ => self.end_game(
                game_id,
                GameEnd {
                    outcome: GameOutcome::Desertion,
                    winner: Some(player.opponent()),
                },
            ),
        }
    }
}

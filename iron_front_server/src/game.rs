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

//! Running games: in-game message handlers, turn sequencing and game end

use iron_front_common::{
    PlayerId, Position, UnitId,
    error::GameError,
    game::{Game, GameEnd, GameOutcome, TurnOutcome},
    message::{GameId, ServerMessage, UnitConfiguration, UnitPosition},
};
use tracing::{debug, info};

use crate::{
    server::Server,
    session::{SessionId, SessionState},
    timer::TimerKind,
};

/// A game plus the sessions playing it
#[derive(Debug)]
pub struct ServerGame {
    pub game: Game,
    /// Indexed by [`PlayerId::index`]
    pub sessions: [Option<SessionId>; 2],
    pub private_key: Option<String>,
}

impl Server {
    /// The game and seat of a session that is in a game
    fn seat(&self, id: SessionId) -> (GameId, PlayerId) {
        self.sessions
            .get(&id)
            .and_then(|session| session.game)
            .expect("in-game messages are only accepted from seated sessions")
    }

    fn game_mut(&mut self, game_id: GameId) -> &mut Game {
        &mut self
            .games
            .get_mut(&game_id)
            .expect("seated sessions always have a game")
            .game
    }

    fn broadcast(&self, game_id: GameId, message: ServerMessage) {
        let Some(server_game) = self.games.get(&game_id) else {
            return;
        };
        for id in server_game.sessions.iter().flatten() {
            self.send(*id, message.clone());
        }
    }

    /// Copy each player's phase onto their session
    fn sync_phases(&mut self, game_id: GameId) {
        let Some(server_game) = self.games.get(&game_id) else {
            return;
        };
        for player in PlayerId::ALL {
            let phase = server_game.game.player(player).map(|state| state.phase);
            if let (Some(id), Some(phase)) = (server_game.sessions[player.index()], phase)
                && let Some(session) = self.sessions.get_mut(&id)
            {
                session.set_state(SessionState::InGame(phase));
            }
        }
    }

    /// Both seats are filled; tell each side about the other and start
    /// deployment
    pub(crate) fn on_opponent_found(&mut self, game_id: GameId) {
        let Some(server_game) = self.games.get(&game_id) else {
            return;
        };
        let game = &server_game.game;
        for player in PlayerId::ALL {
            let opponent = player.opponent();
            let (Some(own), Some(other)) = (
                game.player(player),
                game.player(opponent),
            ) else {
                continue;
            };
            let opponent_name = server_game.sessions[opponent.index()]
                .and_then(|id| self.sessions.get(&id))
                .and_then(|session| session.name.clone())
                .unwrap_or_default();
            if let Some(id) = server_game.sessions[player.index()] {
                self.send(
                    id,
                    ServerMessage::GameStart {
                        identifier: player,
                        configuration: game.configuration.clone(),
                        opponent_name,
                        army: own.base_army(),
                        opponent_army: other.base_army(),
                        reinforcement_points: own.reinforcement_points,
                    },
                );
            }
        }
        let deployment_time = game.configuration.deployment_time;

        self.sync_phases(game_id);
        self.request_timer(game_id, TimerKind::Deployment, deployment_time);
        info!(game = %game_id, "deployment started");
    }

    pub(crate) fn initial_deployment(
        &mut self,
        id: SessionId,
        units: &[UnitPosition],
        requested_first_turn: bool,
    ) -> Result<(), GameError> {
        let (game_id, player) = self.seat(id);
        let both_deployed =
            self.game_mut(game_id)
                .initial_deployment(player, units, requested_first_turn)?;
        debug!(game = %game_id, %player, units = units.len(), "deployment submitted");
        self.sync_phases(game_id);
        if both_deployed {
            self.start_game(game_id);
        }
        Ok(())
    }

    /// Reveal deployments and run the first turn
    fn start_game(&mut self, game_id: GameId) {
        if let Some(server_game) = self.games.get(&game_id) {
            for player in PlayerId::ALL {
                let deployment = server_game
                    .game
                    .player(player.opponent())
                    .map(|opponent| opponent.deployment())
                    .unwrap_or_default();
                if let Some(id) = server_game.sessions[player.index()] {
                    self.send(id, ServerMessage::OpponentDeployment(deployment));
                }
            }
        }
        info!(game = %game_id, "game started");
        let outcome = self.game_mut(game_id).start();
        self.handle_turn_outcome(game_id, outcome);
    }

    fn handle_turn_outcome(&mut self, game_id: GameId, outcome: TurnOutcome) {
        match outcome {
            TurnOutcome::Continue {
                turn,
                active,
                attrition,
            } => {
                debug!(game = %game_id, turn, %active, casualties = attrition.len(), "new turn");
                self.sync_phases(game_id);
                self.broadcast(
                    game_id,
                    ServerMessage::NewTurn {
                        turn,
                        active,
                        attrition,
                    },
                );
                let turn_time = self.game_mut(game_id).configuration.turn_time;
                self.request_timer(game_id, TimerKind::Turn(turn), turn_time);
            }
            TurnOutcome::Over(end) => self.end_game(game_id, end),
        }
    }

    pub(crate) fn move_unit(
        &mut self,
        id: SessionId,
        unit: UnitId,
        destination: Position,
    ) -> Result<(), GameError> {
        let (game_id, player) = self.seat(id);
        let (movement_points, captures) =
            self.game_mut(game_id).move_unit(player, unit, destination)?;
        self.broadcast(
            game_id,
            ServerMessage::UnitMoved {
                player,
                unit,
                destination,
                movement_points,
                captures,
            },
        );
        Ok(())
    }

    pub(crate) fn entrench_unit(&mut self, id: SessionId, unit: UnitId) -> Result<(), GameError> {
        let (game_id, player) = self.seat(id);
        self.game_mut(game_id).entrench_unit(player, unit)?;
        self.broadcast(game_id, ServerMessage::UnitEntrenched { player, unit });
        Ok(())
    }

    pub(crate) fn attack_unit(
        &mut self,
        id: SessionId,
        attacker: UnitId,
        defender: UnitId,
    ) -> Result<(), GameError> {
        let (game_id, player) = self.seat(id);
        let outcome = self
            .game_mut(game_id)
            .attack_unit(player, attacker, defender)?;
        debug!(game = %game_id, %attacker, %defender, ?outcome, "combat");
        self.broadcast(
            game_id,
            ServerMessage::UnitAttacked {
                player,
                attacker,
                defender,
                attacker_strength: outcome.attacker_strength,
                defender_strength: outcome.defender_strength,
            },
        );
        if let Some(end) = self.game_mut(game_id).annihilation_check() {
            self.end_game(game_id, end);
        }
        Ok(())
    }

    pub(crate) fn deploy_unit(
        &mut self,
        id: SessionId,
        unit: UnitId,
        position: Position,
    ) -> Result<(), GameError> {
        let (game_id, player) = self.seat(id);
        self.game_mut(game_id).deploy_unit(player, unit, position)?;
        self.broadcast(
            game_id,
            ServerMessage::UnitDeployed {
                player,
                unit,
                position,
            },
        );
        Ok(())
    }

    pub(crate) fn reinforce_unit(&mut self, id: SessionId, unit: UnitId) -> Result<(), GameError> {
        let (game_id, player) = self.seat(id);
        let (strength, reinforcement_points) =
            self.game_mut(game_id).reinforce_unit(player, unit)?;
        self.broadcast(
            game_id,
            ServerMessage::UnitReinforced {
                player,
                unit,
                strength,
                reinforcement_points,
            },
        );
        Ok(())
    }

    pub(crate) fn purchase_unit(
        &mut self,
        id: SessionId,
        configuration: &UnitConfiguration,
    ) -> Result<(), GameError> {
        let (game_id, player) = self.seat(id);
        let (unit, reinforcement_points) =
            self.game_mut(game_id).purchase_unit(player, configuration)?;
        self.broadcast(
            game_id,
            ServerMessage::UnitPurchased {
                player,
                unit,
                reinforcement_points,
            },
        );
        Ok(())
    }

    pub(crate) fn upgrade_unit(
        &mut self,
        id: SessionId,
        unit: UnitId,
        upgrade: usize,
    ) -> Result<(), GameError> {
        let (game_id, player) = self.seat(id);
        let reinforcement_points = self.game_mut(game_id).upgrade_unit(player, unit, upgrade)?;
        self.broadcast(
            game_id,
            ServerMessage::UnitUpgraded {
                player,
                unit,
                upgrade,
                reinforcement_points,
            },
        );
        Ok(())
    }

    pub(crate) fn end_turn(&mut self, id: SessionId) {
        let (game_id, player) = self.seat(id);
        debug!(game = %game_id, %player, "turn ended early");
        let outcome = self.game_mut(game_id).new_turn();
        self.handle_turn_outcome(game_id, outcome);
    }

    pub(crate) fn surrender(&mut self, id: SessionId) {
        let (game_id, player) = self.seat(id);
        self.end_game(
            game_id,
            GameEnd {
                outcome: GameOutcome::Surrender,
                winner: Some(player.opponent()),
            },
        );
    }

    /// The one way out of a running game
    ///
    /// Drops the game, so timers still pending for it find nothing to do
    pub(crate) fn end_game(&mut self, game_id: GameId, end: GameEnd) {
        let Some(mut server_game) = self.games.remove(&game_id) else {
            return;
        };
        let end = server_game.game.end(end);
        info!(game = %game_id, outcome = ?end.outcome, winner = ?end.winner, "game over");
        for id in server_game.sessions.iter().flatten() {
            if let Some(session) = self.sessions.get_mut(id) {
                session.send(ServerMessage::GameEnd(end));
                session.game = None;
                session.set_state(SessionState::LoggedIn);
            }
        }
    }

    /// A timer went off; stale timers are ignored
    pub fn on_timer_expired(&mut self, game_id: GameId, timer: TimerKind) {
        let Some(server_game) = self.games.get(&game_id) else {
            debug!(game = %game_id, ?timer, "timer fired for a finished game");
            return;
        };
        let game = &server_game.game;
        if game.is_over() {
            return;
        }
        match timer {
            TimerKind::Deployment if game.turn_counter() == 0 => {
                info!(game = %game_id, "deployment time is up");
                self.start_game(game_id);
            }
            TimerKind::Turn(turn) if turn == game.turn_counter() => {
                info!(game = %game_id, turn, "turn time is up");
                let outcome = self.game_mut(game_id).new_turn();
                self.handle_turn_outcome(game_id, outcome);
            }
            _ => debug!(game = %game_id, ?timer, "stale timer"),
        }
    }
}

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

//! A match between two players
//!
//! Knows nothing of connections or timers; the server sequences calls into
//! here and forwards the results

use std::{collections::HashMap, sync::Arc};

use rand::Rng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    IdGenerator, PlayerId, Position, UnitId,
    combat::{Combat, CombatOutcome},
    constants::{
        DEPLOYMENT_TIME_RANGE, POINTS_RANGE, REINFORCEMENT_POINTS_BASE_RATIO,
        REINFORCEMENT_POINTS_PENALTY_FACTOR, TURN_LIMIT_RANGE, TURN_TIME_RANGE,
    },
    error::GameError,
    map::Map,
    message::{BaseArmy, UnitCasualties, UnitConfiguration, UnitPosition},
    player::{PlayerPhase, PlayerState},
    unit::{Faction, Unit},
};

/// Terms of a game, chosen by its creator
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GameConfiguration {
    /// Name of the map
    pub map: String,
    /// Army point budget per player
    pub points: u32,
    /// Turns per player before the game is decided on map control
    pub turn_limit: u32,
    /// Seconds allowed for initial deployment
    pub deployment_time: u32,
    /// Seconds per turn
    pub turn_time: u32,
}

impl GameConfiguration {
    /// Check every value is in range
    pub fn validate(&self) -> Result<(), GameError> {
        if !POINTS_RANGE.contains(&self.points) {
            return Err(GameError::InvalidConfiguration("points out of range"));
        }
        if !TURN_LIMIT_RANGE.contains(&self.turn_limit) {
            return Err(GameError::InvalidConfiguration("turn limit out of range"));
        }
        if !DEPLOYMENT_TIME_RANGE.contains(&self.deployment_time) {
            return Err(GameError::InvalidConfiguration(
                "deployment time out of range",
            ));
        }
        if !TURN_TIME_RANGE.contains(&self.turn_time) {
            return Err(GameError::InvalidConfiguration("turn time out of range"));
        }
        Ok(())
    }
}

/// How a game ended
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// One side lost every unit
    Annihilation,
    /// Both sides lost every unit at once
    MutualAnnihilation,
    /// Turn limit reached; the side holding more hexes won
    Domination,
    /// Turn limit reached with equal map control
    Draw,
    /// The loser conceded
    Surrender,
    /// The loser disconnected
    Desertion,
}

/// Final result of a game
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct GameEnd {
    /// How it ended
    pub outcome: GameOutcome,
    /// Who won, unless nobody did
    pub winner: Option<PlayerId>,
}

/// What starting a turn led to
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Play on
    Continue {
        /// Number of the turn, starting at 1
        turn: u32,
        /// Who may act
        active: PlayerId,
        /// Units worn down by attrition, from both sides
        attrition: Vec<UnitCasualties>,
    },
    /// The game is over
    Over(GameEnd),
}

/// Pick who moves first
///
/// A lone request is honoured without touching the rng
pub fn first_turn(requested: [bool; 2], rng: &mut impl Rng) -> PlayerId {
    match requested {
        [true, false] => PlayerId::Player1,
        [false, true] => PlayerId::Player2,
        _ => {
            if rng.random_bool(0.5) {
                PlayerId::Player1
            } else {
                PlayerId::Player2
            }
        }
    }
}

fn split(
    players: &mut [Option<PlayerState>; 2],
    player: PlayerId,
) -> (&mut PlayerState, &mut PlayerState) {
    let [first, second] = players;
    let (me, opponent) = match player {
        PlayerId::Player1 => (first, second),
        PlayerId::Player2 => (second, first),
    };
    (
        me.as_mut().expect("players should be present once the game has started"),
        opponent
            .as_mut()
            .expect("players should be present once the game has started"),
    )
}

/// A match
#[derive(Debug)]
pub struct Game {
    /// Terms of the game
    pub configuration: GameConfiguration,
    map: Map,
    players: [Option<PlayerState>; 2],
    unit_ids: IdGenerator<UnitId, u32>,
    game_over: bool,
    turn_counter: u32,
    combat: Combat,
    rng: Pcg64,
}

impl Game {
    /// A game with no armies yet
    pub fn new(configuration: GameConfiguration, map: Map, rng: Pcg64) -> Self {
        Self {
            configuration,
            map,
            players: [None, None],
            unit_ids: IdGenerator::default(),
            game_over: false,
            turn_counter: 0,
            combat: Combat::default(),
            rng,
        }
    }

    /// Use fixed combat efficiency
    pub fn with_combat(mut self, combat: Combat) -> Self {
        self.combat = combat;
        self
    }

    /// The board
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// A side, once its army exists
    pub fn player(&self, player: PlayerId) -> Option<&PlayerState> {
        self.players[player.index()].as_ref()
    }

    /// Turns started so far
    pub fn turn_counter(&self) -> u32 {
        self.turn_counter
    }

    /// Has this ended
    pub fn is_over(&self) -> bool {
        self.game_over
    }

    /// Whose turn it is, once turns have started
    pub fn active_player(&self) -> Option<PlayerId> {
        PlayerId::ALL.into_iter().find(|&player| {
            self.player(player)
                .is_some_and(|state| state.phase == PlayerPhase::MyTurn)
        })
    }

    /// Validate and build a player's army
    pub fn create_army(
        &mut self,
        player: PlayerId,
        factions: &[Arc<Faction>],
        army: &BaseArmy,
    ) -> Result<(), GameError> {
        let faction = factions
            .get(army.faction)
            .ok_or(GameError::NoSuchFaction)?;
        if army.units.is_empty() {
            return Err(GameError::EmptyArmy);
        }

        let mut fielded = HashMap::new();
        let mut units = Vec::with_capacity(army.units.len());
        for configuration in &army.units {
            if configuration.faction != army.faction {
                return Err(GameError::WrongFaction);
            }
            let unit_type = faction.unit_type(configuration.unit_type)?;
            let count = fielded.entry(configuration.unit_type).or_insert(0u32);
            *count += 1;
            if unit_type.limit.is_some_and(|limit| *count > limit) {
                return Err(GameError::UnitLimitExceeded(unit_type.name.clone()));
            }
            units.push(Unit::new(
                player,
                self.unit_ids.next().expect("should be infinite"),
                army.faction,
                configuration.unit_type,
                unit_type.clone(),
                configuration.upgrades.clone(),
            )?);
        }

        let spent = units.iter().map(|unit| unit.points).sum::<u32>();
        let available = self.configuration.points;
        if spent > available {
            return Err(GameError::TooManyPoints { spent, available });
        }
        let reinforcement_points = (REINFORCEMENT_POINTS_PENALTY_FACTOR
            * (available - spent) as f64
            + REINFORCEMENT_POINTS_BASE_RATIO * available as f64)
            as u32;

        self.players[player.index()] = Some(PlayerState::new(
            player,
            army.faction,
            faction.clone(),
            units,
            reinforcement_points,
        ));
        Ok(())
    }

    /// Replace a player's initial deployment
    ///
    /// Returns whether both sides have now deployed
    pub fn initial_deployment(
        &mut self,
        player: PlayerId,
        units: &[UnitPosition],
        requested_first_turn: bool,
    ) -> Result<bool, GameError> {
        let (me, opponent) = split(&mut self.players, player);
        me.reset_deployment(&mut self.map);
        for placement in units {
            me.initial_unit_deployment(&mut self.map, placement.unit, placement.position)?;
        }
        me.requested_first_turn = requested_first_turn;
        me.phase = PlayerPhase::HasDeployedUnits;
        Ok(opponent.phase == PlayerPhase::HasDeployedUnits)
    }

    /// Place a held-back unit
    pub fn deploy_unit(
        &mut self,
        player: PlayerId,
        unit: UnitId,
        position: Position,
    ) -> Result<(), GameError> {
        let (me, _) = split(&mut self.players, player);
        me.deploy_unit(&mut self.map, unit, position)
    }

    /// Move a unit; returns movement points left and captured hexes
    pub fn move_unit(
        &mut self,
        player: PlayerId,
        unit: UnitId,
        destination: Position,
    ) -> Result<(i32, Vec<Position>), GameError> {
        let (me, _) = split(&mut self.players, player);
        me.move_unit(&mut self.map, unit, destination)
    }

    /// Dig a unit in
    pub fn entrench_unit(&mut self, player: PlayerId, unit: UnitId) -> Result<(), GameError> {
        let (me, _) = split(&mut self.players, player);
        me.entrench_unit(unit)
    }

    /// Attack an enemy unit
    pub fn attack_unit(
        &mut self,
        player: PlayerId,
        attacker: UnitId,
        defender: UnitId,
    ) -> Result<CombatOutcome, GameError> {
        let (me, opponent) = split(&mut self.players, player);
        me.attack_unit(
            &mut self.map,
            opponent,
            attacker,
            defender,
            &mut self.combat,
            &mut self.rng,
        )
    }

    /// Reinforce a unit; returns its new strength and the points left
    pub fn reinforce_unit(&mut self, player: PlayerId, unit: UnitId) -> Result<(f64, u32), GameError> {
        let (me, _) = split(&mut self.players, player);
        let strength = me.reinforce_unit(&self.map, unit)?;
        Ok((strength, me.reinforcement_points))
    }

    /// Build a unit; returns it with its id, and the points left
    pub fn purchase_unit(
        &mut self,
        player: PlayerId,
        configuration: &UnitConfiguration,
    ) -> Result<(UnitConfiguration, u32), GameError> {
        let (me, _) = split(&mut self.players, player);
        if configuration.faction != me.faction_id {
            return Err(GameError::WrongFaction);
        }
        let unit_type = me.faction.unit_type(configuration.unit_type)?.clone();
        let id = self.unit_ids.next().expect("should be infinite");
        me.purchase_unit(Unit::new(
            player,
            id,
            me.faction_id,
            configuration.unit_type,
            unit_type,
            configuration.upgrades.clone(),
        )?)?;
        Ok((
            UnitConfiguration {
                unit: Some(id),
                ..configuration.clone()
            },
            me.reinforcement_points,
        ))
    }

    /// Upgrade a unit; returns the points left
    pub fn upgrade_unit(
        &mut self,
        player: PlayerId,
        unit: UnitId,
        upgrade: usize,
    ) -> Result<u32, GameError> {
        let (me, _) = split(&mut self.players, player);
        me.upgrade_unit(unit, upgrade)?;
        Ok(me.reinforcement_points)
    }

    /// Finish deployment and run the first turn
    pub fn start(&mut self) -> TurnOutcome {
        let requested = PlayerId::ALL.map(|player| {
            self.player(player)
                .is_some_and(|state| state.requested_first_turn)
        });
        let first = first_turn(requested, &mut self.rng);
        // the first call to new_turn hands the turn to whoever is not marked active
        for player in PlayerId::ALL {
            let (me, _) = split(&mut self.players, player);
            me.phase = if player == first {
                PlayerPhase::OpponentTurn
            } else {
                PlayerPhase::MyTurn
            };
        }
        self.new_turn()
    }

    /// Hand the turn to the other side and run upkeep for both
    pub fn new_turn(&mut self) -> TurnOutcome {
        self.turn_counter += 1;
        if self.turn_counter > 2 * self.configuration.turn_limit {
            return TurnOutcome::Over(self.end(self.domination()));
        }

        let mut attrition = Vec::new();
        for player in PlayerId::ALL {
            let (me, _) = split(&mut self.players, player);
            me.phase = match me.phase {
                PlayerPhase::MyTurn => PlayerPhase::OpponentTurn,
                _ => PlayerPhase::MyTurn,
            };
            me.reset_units();
            attrition.extend(me.evaluate_supply(&mut self.map));
        }

        if let Some(end) = self.annihilation_check() {
            return TurnOutcome::Over(self.end(end));
        }
        TurnOutcome::Continue {
            turn: self.turn_counter,
            active: self
                .active_player()
                .expect("one side should be active after a turn change"),
            attrition,
        }
    }

    /// Has either side run out of units
    pub fn annihilation_check(&self) -> Option<GameEnd> {
        let alive = PlayerId::ALL.map(|player| {
            self.player(player)
                .is_some_and(|state| state.has_units_left())
        });
        match alive {
            [true, true] => None,
            [true, false] => Some(GameEnd {
                outcome: GameOutcome::Annihilation,
                winner: Some(PlayerId::Player1),
            }),
            [false, true] => Some(GameEnd {
                outcome: GameOutcome::Annihilation,
                winner: Some(PlayerId::Player2),
            }),
            [false, false] => Some(GameEnd {
                outcome: GameOutcome::MutualAnnihilation,
                winner: None,
            }),
        }
    }

    /// Decide the game on map control
    pub fn domination(&self) -> GameEnd {
        let control = PlayerId::ALL.map(|player| self.map.map_control(player));
        let winner = match control[0].cmp(&control[1]) {
            std::cmp::Ordering::Greater => Some(PlayerId::Player1),
            std::cmp::Ordering::Less => Some(PlayerId::Player2),
            std::cmp::Ordering::Equal => None,
        };
        GameEnd {
            outcome: if winner.is_some() {
                GameOutcome::Domination
            } else {
                GameOutcome::Draw
            },
            winner,
        }
    }

    /// Mark the game over
    pub fn end(&mut self, end: GameEnd) -> GameEnd {
        self.game_over = true;
        end
    }
}

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

//! One side of a match
//!
//! Every operation validates its preconditions before touching any state, so
//! a rejected request leaves the game as it was

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    PlayerId, Position, UnitId,
    combat::{Combat, CombatOutcome},
    error::GameError,
    map::Map,
    message::{BaseArmy, UnitCasualties, UnitConfiguration, UnitPosition},
    unit::{Faction, Unit, UnitFlag},
};

/// Where a player is in the match, from their own point of view
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    /// Yet to submit an initial deployment
    DeployingUnits,
    /// Submitted an initial deployment; waiting for the opponent
    HasDeployedUnits,
    /// May act
    MyTurn,
    /// Waiting on the opponent
    OpponentTurn,
}

/// A player's army and resources
#[derive(Debug, Clone)]
pub struct PlayerState {
    /// Which side this is
    pub identifier: PlayerId,
    /// Index of the faction
    pub faction_id: usize,
    /// The faction
    pub faction: Arc<Faction>,
    /// Current phase
    pub phase: PlayerPhase,
    /// Asked for the first turn in the initial deployment
    pub requested_first_turn: bool,
    /// Points left for reinforcements, purchases and upgrades
    pub reinforcement_points: u32,
    units: Vec<Unit>,
}

impl PlayerState {
    /// A player about to deploy
    pub fn new(
        identifier: PlayerId,
        faction_id: usize,
        faction: Arc<Faction>,
        units: Vec<Unit>,
        reinforcement_points: u32,
    ) -> Self {
        Self {
            identifier,
            faction_id,
            faction,
            phase: PlayerPhase::DeployingUnits,
            requested_first_turn: false,
            reinforcement_points,
            units,
        }
    }

    /// The roster
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Look up a unit in the roster
    pub fn unit(&self, id: UnitId) -> Result<&Unit, GameError> {
        self.units
            .iter()
            .find(|unit| unit.id == id)
            .ok_or(GameError::UnitNotFound(id))
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, GameError> {
        self.units
            .iter_mut()
            .find(|unit| unit.id == id)
            .ok_or(GameError::UnitNotFound(id))
    }

    /// Does the roster still hold anything
    pub fn has_units_left(&self) -> bool {
        !self.units.is_empty()
    }

    /// Take every unit back off the map
    pub fn reset_deployment(&mut self, map: &mut Map) {
        for unit in &mut self.units {
            if let Some(position) = unit.hex {
                map.remove_unit(position);
            }
            unit.withdraw();
        }
    }

    fn check_placement(&self, map: &Map, id: UnitId, position: Position) -> Result<(), GameError> {
        let unit = self.unit(id)?;
        if unit.deployed {
            return Err(GameError::AlreadyDeployed(id));
        }
        let hex = map
            .hex(position)
            .ok_or(GameError::InvalidPosition(position))?;
        if hex.initial_deployment_zone != Some(self.identifier) {
            return Err(GameError::OutsideDeploymentZone(position));
        }
        if hex.unit.is_some() {
            return Err(GameError::HexOccupied(position));
        }
        Ok(())
    }

    fn place(&mut self, map: &mut Map, id: UnitId, position: Position) -> Result<(), GameError> {
        let terrain = map
            .hex(position)
            .ok_or(GameError::InvalidPosition(position))?
            .terrain;
        let owner = self.identifier;
        self.unit_mut(id)?.place(position, terrain);
        map.place_unit(position, owner, id);
        Ok(())
    }

    /// Place a unit in the initial deployment zone before the first turn
    pub fn initial_unit_deployment(
        &mut self,
        map: &mut Map,
        id: UnitId,
        position: Position,
    ) -> Result<(), GameError> {
        self.check_placement(map, id, position)?;
        self.place(map, id, position)
    }

    /// Place a held-back unit mid-game; the zone must still be held
    pub fn deploy_unit(
        &mut self,
        map: &mut Map,
        id: UnitId,
        position: Position,
    ) -> Result<(), GameError> {
        self.check_placement(map, id, position)?;
        if map.hex(position).and_then(|hex| hex.owner) != Some(self.identifier) {
            return Err(GameError::NotControlled(position));
        }
        self.place(map, id, position)
    }

    /// Move a unit, capturing along the way
    ///
    /// Returns the movement points left and every hex captured
    pub fn move_unit(
        &mut self,
        map: &mut Map,
        id: UnitId,
        destination: Position,
    ) -> Result<(i32, Vec<Position>), GameError> {
        let unit = self.unit(id)?;
        let Some(start) = unit.hex else {
            return Err(GameError::NotDeployed(id));
        };
        let path = map
            .movement_map(unit)
            .remove(&destination)
            .ok_or(GameError::Unreachable(id, destination))?;

        map.remove_unit(start);
        self.place(map, id, destination)?;
        self.unit_mut(id)?.movement_points = path.movement_points_left;
        let captures = map.capture(&path.hexes, self.identifier);
        Ok((path.movement_points_left, captures))
    }

    /// Dig a unit in
    pub fn entrench_unit(&mut self, id: UnitId) -> Result<(), GameError> {
        let unit = self.unit_mut(id)?;
        if !unit.deployed {
            return Err(GameError::NotDeployed(id));
        }
        if !unit.can_entrench() {
            return Err(GameError::CannotEntrench(id));
        }
        unit.entrench();
        Ok(())
    }

    /// Attack an enemy unit, applying the outcome to both units
    pub fn attack_unit(
        &mut self,
        map: &mut Map,
        opponent: &mut PlayerState,
        attacker_id: UnitId,
        defender_id: UnitId,
        combat: &mut Combat,
        rng: &mut impl Rng,
    ) -> Result<CombatOutcome, GameError> {
        let attacker = self.unit(attacker_id)?;
        let defender = opponent.unit(defender_id)?;
        if !attacker.deployed {
            return Err(GameError::NotDeployed(attacker_id));
        }
        if defender.is_air() {
            return Err(GameError::AirTarget);
        }
        let Some(target) = defender.hex else {
            return Err(GameError::NotDeployed(defender_id));
        };
        if !attacker.can_act {
            return Err(GameError::CannotAct(attacker_id));
        }
        if attacker.has_flag(UnitFlag::Artillery) && attacker.has_moved() {
            return Err(GameError::ArtilleryMoved);
        }

        let outcome = if attacker.is_air() {
            let anti_air = opponent.anti_air_units(target);
            combat.resolve(attacker, defender, &anti_air, rng)
        } else {
            let origin = attacker.hex.ok_or(GameError::NotDeployed(attacker_id))?;
            if origin.distance(&target) > attacker.stats.range {
                return Err(GameError::OutOfRange);
            }
            combat.resolve(attacker, defender, &[], rng)
        };

        let attacker = self.unit_mut(attacker_id)?;
        attacker.can_act = false;
        attacker.break_entrenchment();
        attacker.strength = outcome.attacker_strength;
        let attacker_alive = attacker.is_alive();
        let defender = opponent.unit_mut(defender_id)?;
        defender.strength = outcome.defender_strength;
        let defender_alive = defender.is_alive();

        if !attacker_alive {
            self.remove_unit(map, attacker_id);
        }
        if !defender_alive {
            opponent.remove_unit(map, defender_id);
        }
        Ok(outcome)
    }

    /// Restore some of a unit's strength for reinforcement points
    ///
    /// Returns the unit's new strength
    pub fn reinforce_unit(&mut self, map: &Map, id: UnitId) -> Result<f64, GameError> {
        let unit = self.unit(id)?;
        if !unit.deployed {
            return Err(GameError::NotDeployed(id));
        }
        if !unit.can_act {
            return Err(GameError::CannotAct(id));
        }
        if unit.has_moved() {
            return Err(GameError::AlreadyMoved(id));
        }
        if unit.strength >= 1.0 {
            return Err(GameError::FullStrength(id));
        }
        if let Some(position) = unit.hex
            && !map.supply_network(self.identifier).contains(&position)
        {
            return Err(GameError::OutOfSupply(id));
        }

        let delta = unit.reinforcement_cap().min(1.0 - unit.strength);
        let cost = (delta * unit.points as f64).ceil() as u32;
        if cost > self.reinforcement_points {
            return Err(GameError::InsufficientPoints);
        }
        self.reinforcement_points -= cost;

        let unit = self.unit_mut(id)?;
        unit.strength = (unit.strength + delta).min(1.0);
        unit.movement_points = 0;
        unit.can_act = false;
        Ok(unit.strength)
    }

    /// Add a newly built unit to the roster
    pub fn purchase_unit(&mut self, unit: Unit) -> Result<(), GameError> {
        if let Some(limit) = unit.unit_type.limit {
            let fielded = self
                .units
                .iter()
                .filter(|other| other.unit_type_id == unit.unit_type_id)
                .count();
            if fielded >= limit as usize {
                return Err(GameError::UnitLimitExceeded(unit.unit_type.name.clone()));
            }
        }
        if unit.points > self.reinforcement_points {
            return Err(GameError::InsufficientPoints);
        }
        self.reinforcement_points -= unit.points;
        self.units.push(unit);
        Ok(())
    }

    /// Apply an upgrade to a fielded unit
    pub fn upgrade_unit(&mut self, id: UnitId, upgrade: usize) -> Result<(), GameError> {
        let cost = self
            .unit(id)?
            .unit_type
            .upgrades
            .get(upgrade)
            .ok_or(GameError::NoSuchUpgrade)?
            .points;
        if cost > self.reinforcement_points {
            return Err(GameError::InsufficientPoints);
        }
        self.unit_mut(id)?.upgrade(upgrade)?;
        self.reinforcement_points -= cost;
        Ok(())
    }

    /// Anti-air units covering a hex
    pub fn anti_air_units(&self, target: Position) -> Vec<&Unit> {
        self.units
            .iter()
            .filter(|unit| unit.deployed && unit.has_flag(UnitFlag::AntiAir))
            .filter(|unit| {
                unit.hex
                    .is_some_and(|hex| hex.distance(&target) <= unit.stats.anti_air_range)
            })
            .collect()
    }

    /// Restore every unit's per-turn budget
    pub fn reset_units(&mut self) {
        for unit in &mut self.units {
            unit.reset_for_new_turn();
        }
    }

    /// Apply attrition to units cut off from supply
    ///
    /// Returns the units that lost strength; destroyed units are removed
    pub fn evaluate_supply(&mut self, map: &mut Map) -> Vec<UnitCasualties> {
        let network = map.supply_network(self.identifier);
        let mut casualties = Vec::new();
        for unit in &mut self.units {
            let Some(position) = unit.hex else {
                continue;
            };
            if network.contains(&position) {
                unit.attrition_duration = 0;
                continue;
            }
            unit.attrition_duration += 1;
            if unit.attrition_duration > 1 {
                unit.take_attrition_damage();
                casualties.push(UnitCasualties {
                    unit: unit.id,
                    strength: unit.strength,
                    can_act: unit.can_act,
                });
            }
        }
        let dead = self
            .units
            .iter()
            .filter(|unit| !unit.is_alive())
            .map(|unit| unit.id)
            .collect::<Vec<_>>();
        for id in dead {
            self.remove_unit(map, id);
        }
        casualties
    }

    fn remove_unit(&mut self, map: &mut Map, id: UnitId) {
        if let Some(index) = self.units.iter().position(|unit| unit.id == id) {
            let unit = self.units.remove(index);
            if let Some(position) = unit.hex {
                map.remove_unit(position);
            }
        }
    }

    /// Positions of every unit on the map
    pub fn deployment(&self) -> Vec<UnitPosition> {
        self.units
            .iter()
            .filter_map(|unit| {
                unit.hex.map(|position| UnitPosition {
                    unit: unit.id,
                    position,
                })
            })
            .collect()
    }

    /// The roster as sent to clients
    pub fn base_army(&self) -> BaseArmy {
        BaseArmy {
            faction: self.faction_id,
            units: self
                .units
                .iter()
                .map(|unit| UnitConfiguration {
                    unit: Some(unit.id),
                    faction: unit.faction,
                    unit_type: unit.unit_type_id,
                    upgrades: unit.upgrades.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::{
        IdGenerator,
        map::tests::grid,
        unit::{UnitClass, UnitStats, UnitType, UnitUpgrade},
    };

    pub(crate) fn faction() -> Arc<Faction> {
        let unit = |name: &str, class, points, stats| {
            Arc::new(UnitType {
                name: name.to_string(),
                points,
                limit: None,
                class,
                hardness: 0.0,
                stats,
                upgrades: vec![UnitUpgrade {
                    name: "Radio".to_string(),
                    description: String::new(),
                    slot: 0,
                    points: 15,
                    bonus: UnitStats {
                        range: 1,
                        ..Default::default()
                    },
                }],
            })
        };
        Arc::new(Faction {
            name: "Testers".to_string(),
            description: String::new(),
            units: vec![
                unit(
                    "Rifles",
                    UnitClass::Infantry,
                    100,
                    UnitStats {
                        soft_attack: 4,
                        hard_attack: 1,
                        soft_defence: 4,
                        hard_defence: 2,
                        range: 1,
                        movement: 3,
                        ..Default::default()
                    },
                ),
                unit(
                    "Howitzer",
                    UnitClass::Motorized,
                    200,
                    UnitStats {
                        soft_attack: 6,
                        hard_attack: 3,
                        soft_defence: 1,
                        hard_defence: 1,
                        range: 3,
                        movement: 2,
                        flags: vec![UnitFlag::Artillery],
                        ..Default::default()
                    },
                ),
                unit(
                    "Bomber",
                    UnitClass::Air,
                    300,
                    UnitStats {
                        soft_attack: 8,
                        hard_attack: 8,
                        anti_air_defence: 2,
                        ..Default::default()
                    },
                ),
                unit(
                    "Flak",
                    UnitClass::Motorized,
                    150,
                    UnitStats {
                        soft_defence: 2,
                        hard_defence: 2,
                        air_attack: 6,
                        anti_air_range: 2,
                        movement: 2,
                        flags: vec![UnitFlag::AntiAir],
                        ..Default::default()
                    },
                ),
            ],
        })
    }

    pub(crate) fn player(
        identifier: PlayerId,
        unit_types: &[usize],
        ids: &mut IdGenerator<UnitId, u32>,
    ) -> PlayerState {
        let faction = faction();
        let units = unit_types
            .iter()
            .map(|&unit_type| {
                Unit::new(
                    identifier,
                    ids.next().expect("should be infinite"),
                    0,
                    unit_type,
                    faction.units[unit_type].clone(),
                    Vec::new(),
                )
                .expect("valid unit")
            })
            .collect();
        PlayerState::new(identifier, 0, faction, units, 500)
    }

    fn map(width: i32) -> Map {
        Map::new("test".to_string(), grid(width, 3), Vec::new()).expect("valid map")
    }

    fn id(player: &PlayerState, index: usize) -> UnitId {
        player.units()[index].id
    }

    #[test]
    fn initial_deployment_stays_in_the_zone() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0, 0, 2], &mut ids);
        let (first, second, plane) = (id(&me, 0), id(&me, 1), id(&me, 2));

        assert_eq!(
            me.initial_unit_deployment(&mut map, first, Position::new(1, 0)),
            Err(GameError::OutsideDeploymentZone(Position::new(1, 0)))
        );
        assert_eq!(
            me.initial_unit_deployment(&mut map, first, Position::new(9, 9)),
            Err(GameError::InvalidPosition(Position::new(9, 9)))
        );
        me.initial_unit_deployment(&mut map, first, Position::new(0, 0))
            .expect("in zone");
        assert_eq!(
            me.initial_unit_deployment(&mut map, first, Position::new(0, 1)),
            Err(GameError::AlreadyDeployed(first))
        );
        assert_eq!(
            me.initial_unit_deployment(&mut map, second, Position::new(0, 0)),
            Err(GameError::HexOccupied(Position::new(0, 0)))
        );
        assert_eq!(
            me.initial_unit_deployment(&mut map, plane, Position::new(0, 2)),
            Err(GameError::AlreadyDeployed(plane))
        );
    }

    #[test]
    fn redeployment_clears_the_old_plan() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0, 0], &mut ids);
        let (first, second) = (id(&me, 0), id(&me, 1));
        me.initial_unit_deployment(&mut map, first, Position::new(0, 0))
            .expect("in zone");
        me.initial_unit_deployment(&mut map, second, Position::new(0, 1))
            .expect("in zone");

        me.reset_deployment(&mut map);
        me.initial_unit_deployment(&mut map, first, Position::new(0, 2))
            .expect("in zone");

        assert!(
            map.hexes()
                .iter()
                .filter(|hex| hex.unit.is_some())
                .map(|hex| hex.position)
                .eq([Position::new(0, 2)])
        );
        assert_eq!(
            me.deployment(),
            vec![UnitPosition {
                unit: first,
                position: Position::new(0, 2)
            }]
        );
        assert!(!me.unit(second).expect("in roster").deployed);
    }

    #[test]
    fn late_deployment_needs_a_held_zone() {
        let mut map = map(3);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0], &mut ids);
        let unit = id(&me, 0);
        map.capture(&[Position::new(0, 0)], PlayerId::Player2);

        assert_eq!(
            me.deploy_unit(&mut map, unit, Position::new(0, 0)),
            Err(GameError::NotControlled(Position::new(0, 0)))
        );
        assert_eq!(
            me.deploy_unit(&mut map, unit, Position::new(1, 1)),
            Err(GameError::OutsideDeploymentZone(Position::new(1, 1)))
        );
        me.deploy_unit(&mut map, unit, Position::new(0, 2))
            .expect("still held");
        assert!(me.unit(unit).expect("in roster").deployed);
    }

    #[test]
    fn moving_captures_and_spends_movement() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0], &mut ids);
        let unit = id(&me, 0);
        me.initial_unit_deployment(&mut map, unit, Position::new(0, 1))
            .expect("in zone");

        let (left, captures) = me
            .move_unit(&mut map, unit, Position::new(2, 1))
            .expect("reachable");
        assert_eq!(left, 1);
        assert!(captures.contains(&Position::new(1, 1)));
        assert!(captures.contains(&Position::new(2, 1)));
        assert_eq!(map.hex(Position::new(0, 1)).and_then(|hex| hex.unit), None);
        assert_eq!(
            map.hex(Position::new(2, 1))
                .and_then(|hex| hex.unit)
                .map(|occupant| occupant.unit),
            Some(unit)
        );
        assert_eq!(
            me.move_unit(&mut map, unit, Position::new(4, 1)),
            Err(GameError::Unreachable(unit, Position::new(4, 1)))
        );
    }

    #[test]
    fn entrenchment_needs_a_fresh_infantry_unit() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0, 1], &mut ids);
        let (rifles, gun) = (id(&me, 0), id(&me, 1));
        assert_eq!(me.entrench_unit(rifles), Err(GameError::NotDeployed(rifles)));

        me.initial_unit_deployment(&mut map, rifles, Position::new(0, 0))
            .expect("in zone");
        me.initial_unit_deployment(&mut map, gun, Position::new(0, 1))
            .expect("in zone");
        assert_eq!(me.entrench_unit(gun), Err(GameError::CannotEntrench(gun)));
        me.entrench_unit(rifles).expect("fresh infantry");
        let entrenched = me.unit(rifles).expect("in roster");
        assert!(entrenched.entrenched);
        assert!(entrenched.can_act);
        assert_eq!(entrenched.movement_points, 0);
        assert_eq!(me.entrench_unit(rifles), Err(GameError::CannotEntrench(rifles)));
    }

    #[test]
    fn attacks_check_range_and_use_the_action() {
        let mut map = map(4);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0, 1], &mut ids);
        let mut them = player(PlayerId::Player2, &[0], &mut ids);
        let (rifles, gun, target) = (id(&me, 0), id(&me, 1), id(&them, 0));
        let mut combat = Combat::new(false);
        let mut rng = Pcg64::seed_from_u64(3);

        me.initial_unit_deployment(&mut map, rifles, Position::new(0, 0))
            .expect("in zone");
        me.initial_unit_deployment(&mut map, gun, Position::new(0, 1))
            .expect("in zone");
        them.initial_unit_deployment(&mut map, target, Position::new(3, 0))
            .expect("in zone");

        assert_eq!(
            me.attack_unit(&mut map, &mut them, rifles, target, &mut combat, &mut rng),
            Err(GameError::OutOfRange)
        );
        let outcome = me
            .attack_unit(&mut map, &mut them, gun, target, &mut combat, &mut rng)
            .expect("in range");
        assert_eq!(outcome.attacker_strength, 1.0);
        assert_eq!(
            them.unit(target).expect("survived").strength,
            outcome.defender_strength
        );
        assert_eq!(
            me.attack_unit(&mut map, &mut them, gun, target, &mut combat, &mut rng),
            Err(GameError::CannotAct(gun))
        );
    }

    #[test]
    fn artillery_cannot_fire_after_moving() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[1], &mut ids);
        let mut them = player(PlayerId::Player2, &[0], &mut ids);
        let (gun, target) = (id(&me, 0), id(&them, 0));
        me.initial_unit_deployment(&mut map, gun, Position::new(0, 0))
            .expect("in zone");
        them.initial_unit_deployment(&mut map, target, Position::new(4, 0))
            .expect("in zone");
        me.move_unit(&mut map, gun, Position::new(1, 0))
            .expect("reachable");

        assert_eq!(
            me.attack_unit(
                &mut map,
                &mut them,
                gun,
                target,
                &mut Combat::new(false),
                &mut Pcg64::seed_from_u64(0)
            ),
            Err(GameError::ArtilleryMoved)
        );
    }

    #[test]
    fn destroyed_units_leave_the_map() {
        let mut map = map(3);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0], &mut ids);
        let mut them = player(PlayerId::Player2, &[0, 2], &mut ids);
        let (rifles, target, plane) = (id(&me, 0), id(&them, 0), id(&them, 1));
        me.initial_unit_deployment(&mut map, rifles, Position::new(0, 0))
            .expect("in zone");
        them.initial_unit_deployment(&mut map, target, Position::new(2, 0))
            .expect("in zone");
        me.move_unit(&mut map, rifles, Position::new(1, 0))
            .expect("reachable");
        them.unit_mut(target).expect("in roster").strength = 0.06;

        let mut combat = Combat::new(false);
        let mut rng = Pcg64::seed_from_u64(0);
        assert_eq!(
            me.attack_unit(&mut map, &mut them, rifles, plane, &mut combat, &mut rng),
            Err(GameError::AirTarget)
        );
        let outcome = me
            .attack_unit(&mut map, &mut them, rifles, target, &mut combat, &mut rng)
            .expect("adjacent");
        assert_eq!(outcome.defender_strength, 0.0);
        assert_eq!(
            them.unit(target).unwrap_err(),
            GameError::UnitNotFound(target)
        );
        assert_eq!(map.hex(Position::new(2, 0)).and_then(|hex| hex.unit), None);
    }

    #[test]
    fn bombers_draw_anti_air_fire() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[2], &mut ids);
        let mut them = player(PlayerId::Player2, &[0, 3], &mut ids);
        let (bomber, target, flak) = (id(&me, 0), id(&them, 0), id(&them, 1));
        them.initial_unit_deployment(&mut map, target, Position::new(4, 0))
            .expect("in zone");

        let mut combat = Combat::new(false);
        let mut rng = Pcg64::seed_from_u64(0);
        let unopposed = me
            .attack_unit(&mut map, &mut them, bomber, target, &mut combat, &mut rng)
            .expect("air units reach anywhere");
        assert_eq!(unopposed.attacker_strength, 1.0);

        them.initial_unit_deployment(&mut map, flak, Position::new(4, 2))
            .expect("in zone");
        assert_eq!(them.anti_air_units(Position::new(4, 0)).len(), 1);
        me.reset_units();
        let opposed = me
            .attack_unit(&mut map, &mut them, bomber, target, &mut combat, &mut rng)
            .expect("air units reach anywhere");
        assert!(opposed.attacker_strength < 1.0);
    }

    #[test]
    fn reinforcement_is_capped_and_paid_for() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0, 0], &mut ids);
        let (home, away) = (id(&me, 0), id(&me, 1));
        me.initial_unit_deployment(&mut map, home, Position::new(0, 0))
            .expect("in zone");
        me.initial_unit_deployment(&mut map, away, Position::new(0, 1))
            .expect("in zone");
        assert_eq!(me.reinforce_unit(&map, home), Err(GameError::FullStrength(home)));

        me.unit_mut(home).expect("in roster").strength = 0.3;
        let strength = me.reinforce_unit(&map, home).expect("in supply");
        assert!((strength - 0.7).abs() < 1e-9);
        assert_eq!(me.reinforcement_points, 460);
        let unit = me.unit(home).expect("in roster");
        assert!(!unit.can_act);
        assert_eq!(unit.movement_points, 0);
        assert_eq!(me.reinforce_unit(&map, home), Err(GameError::CannotAct(home)));

        me.move_unit(&mut map, away, Position::new(2, 1))
            .expect("reachable");
        me.unit_mut(away).expect("in roster").strength = 0.5;
        assert_eq!(me.reinforce_unit(&map, away), Err(GameError::AlreadyMoved(away)));
        me.reset_units();
        // the captured corridor keeps (2, 1) connected to the supply source
        assert!(me.reinforce_unit(&map, away).is_ok());
    }

    #[test]
    fn cut_off_units_cannot_reinforce() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0], &mut ids);
        let mut them = player(PlayerId::Player2, &[0], &mut ids);
        let (unit, blocker) = (id(&me, 0), id(&them, 0));
        me.initial_unit_deployment(&mut map, unit, Position::new(0, 1))
            .expect("in zone");
        them.initial_unit_deployment(&mut map, blocker, Position::new(4, 1))
            .expect("in zone");
        me.move_unit(&mut map, unit, Position::new(2, 1))
            .expect("reachable");
        me.reset_units();

        // retake the whole first column
        for y in 0..3 {
            map.capture(&[Position::new(0, y)], PlayerId::Player2);
        }
        me.unit_mut(unit).expect("in roster").strength = 0.5;
        assert_eq!(me.reinforce_unit(&map, unit), Err(GameError::OutOfSupply(unit)));
    }

    #[test]
    fn purchases_respect_points_and_limits() {
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[], &mut ids);
        let mut build = |unit_type: usize| {
            Unit::new(
                PlayerId::Player1,
                ids.next().expect("should be infinite"),
                0,
                unit_type,
                me.faction.units[unit_type].clone(),
                Vec::new(),
            )
            .expect("valid unit")
        };
        let bomber = build(2);
        let second_bomber = build(2);
        let rifles = build(0);

        me.purchase_unit(bomber).expect("affordable");
        assert_eq!(me.reinforcement_points, 200);
        assert_eq!(
            me.purchase_unit(second_bomber),
            Err(GameError::InsufficientPoints)
        );
        me.purchase_unit(rifles).expect("affordable");
        assert_eq!(me.units().len(), 2);

        let mut limited = (*me.faction.units[0]).clone();
        limited.limit = Some(1);
        let extra = Unit::new(
            PlayerId::Player1,
            UnitId::from(99),
            0,
            0,
            Arc::new(limited),
            Vec::new(),
        )
        .expect("valid unit");
        assert_eq!(
            me.purchase_unit(extra),
            Err(GameError::UnitLimitExceeded("Rifles".to_string()))
        );
    }

    #[test]
    fn upgrades_cost_points() {
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0], &mut ids);
        let unit = id(&me, 0);
        me.upgrade_unit(unit, 0).expect("affordable");
        assert_eq!(me.reinforcement_points, 485);
        assert_eq!(me.unit(unit).expect("in roster").stats.range, 2);
        assert_eq!(me.upgrade_unit(unit, 0), Err(GameError::UpgradeSlotOccupied(0)));
        assert_eq!(me.upgrade_unit(unit, 4), Err(GameError::NoSuchUpgrade));
        let mut fresh = player(PlayerId::Player1, &[0], &mut ids);
        fresh.reinforcement_points = 10;
        let other = id(&fresh, 0);
        assert_eq!(fresh.upgrade_unit(other, 0), Err(GameError::InsufficientPoints));
    }

    #[test]
    fn attrition_needs_two_turns_out_of_supply() {
        let mut map = map(5);
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0, 0], &mut ids);
        let (cut_off, safe) = (id(&me, 0), id(&me, 1));
        me.initial_unit_deployment(&mut map, cut_off, Position::new(0, 0))
            .expect("in zone");
        me.initial_unit_deployment(&mut map, safe, Position::new(0, 2))
            .expect("in zone");
        me.move_unit(&mut map, cut_off, Position::new(2, 0))
            .expect("reachable");
        // sever the corridor behind the unit
        map.capture(&[Position::new(1, 0)], PlayerId::Player2);
        map.capture(&[Position::new(2, 1)], PlayerId::Player2);
        map.capture(&[Position::new(1, 1)], PlayerId::Player2);
        assert!(
            !map.supply_network(PlayerId::Player1)
                .contains(&Position::new(2, 0))
        );

        assert!(me.evaluate_supply(&mut map).is_empty());
        let casualties = me.evaluate_supply(&mut map);
        assert_eq!(casualties.len(), 1);
        assert_eq!(casualties[0].unit, cut_off);
        assert!(!casualties[0].can_act);
        assert!((casualties[0].strength - 0.95).abs() < 1e-9);

        me.unit_mut(cut_off).expect("in roster").strength = 0.06;
        let casualties = me.evaluate_supply(&mut map);
        assert_eq!(casualties[0].strength, 0.0);
        assert_eq!(me.units().len(), 1);
        assert_eq!(map.hex(Position::new(2, 0)).and_then(|hex| hex.unit), None);
        assert_eq!(me.unit(safe).expect("in roster").attrition_duration, 0);
    }

    #[test]
    fn base_army_lists_ids_and_upgrades() {
        let mut ids = IdGenerator::default();
        let mut me = player(PlayerId::Player1, &[0, 3], &mut ids);
        let unit = id(&me, 0);
        me.upgrade_unit(unit, 0).expect("affordable");
        let army = me.base_army();
        assert_eq!(army.faction, 0);
        assert_eq!(army.units.len(), 2);
        assert_eq!(army.units[0].unit, Some(unit));
        assert_eq!(army.units[0].upgrades, vec![0]);
        assert_eq!(army.units[1].unit_type, 3);
        assert_eq!(
            me.units()[1].stats,
            crate::unit::compute_stats(&me.faction.units[3], &[], None, false)
        );
    }
}

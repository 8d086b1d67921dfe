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

//! Units, unit types and factions

use std::{collections::HashSet, ops::AddAssign, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    PlayerId, Position, UnitId,
    constants::{
        INFANTRY_ATTRITION_RATE, INFANTRY_REINFORCEMENT_CAP, MINIMUM_STRENGTH,
        MOTORIZED_ATTRITION_RATE, MOTORIZED_REINFORCEMENT_CAP,
    },
    error::GameError,
    map::TerrainType,
};

/// Broad category of a unit type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitClass {
    /// Foot soldiers; may entrench
    Infantry,
    /// Tanks, trucks and the like
    Motorized,
    /// Aircraft; occupy no hex and are deployed from the start
    Air,
}

/// Special rules attached to a unit
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitFlag {
    /// Fires at air units attacking nearby targets
    AntiAir,
    /// Cannot attack after moving in the same turn
    Artillery,
    /// Ignores the entrenchment bonus of its targets
    Engineer,
    /// Crosses rivers without a bridge at normal cost
    Amphibious,
}

/// Combat and movement values
///
/// Used both for base stats and for additive bonuses
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UnitStats {
    /// Attack against soft targets
    pub soft_attack: i32,
    /// Attack against hard targets
    pub hard_attack: i32,
    /// Defence against soft attackers
    pub soft_defence: i32,
    /// Defence against hard attackers
    pub hard_defence: i32,
    /// Divides damage received from artillery and aircraft
    pub bombardment_defence: i32,
    /// Attack against aircraft
    pub air_attack: i32,
    /// Divides damage received while attacking from the air
    pub anti_air_defence: i32,
    /// Ground attack range, in hexes
    pub range: i32,
    /// Anti-air cover radius, in hexes
    pub anti_air_range: i32,
    /// Movement points per turn
    pub movement: i32,
    /// Special rules
    pub flags: Vec<UnitFlag>,
}

impl AddAssign<&UnitStats> for UnitStats {
    fn add_assign(&mut self, rhs: &UnitStats) {
        self.soft_attack += rhs.soft_attack;
        self.hard_attack += rhs.hard_attack;
        self.soft_defence += rhs.soft_defence;
        self.hard_defence += rhs.hard_defence;
        self.bombardment_defence += rhs.bombardment_defence;
        self.air_attack += rhs.air_attack;
        self.anti_air_defence += rhs.anti_air_defence;
        self.range += rhs.range;
        self.anti_air_range += rhs.anti_air_range;
        self.movement += rhs.movement;
        for flag in &rhs.flags {
            if !self.flags.contains(flag) {
                self.flags.push(*flag);
            }
        }
    }
}

impl UnitStats {
    /// Does this have some flag
    pub fn has_flag(&self, flag: UnitFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Defensive bonus granted by entrenchment
    pub fn entrenchment_bonus() -> Self {
        Self {
            soft_defence: 1,
            hard_defence: 1,
            bombardment_defence: 1,
            ..Default::default()
        }
    }
}

/// An optional improvement to a unit type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnitUpgrade {
    /// Display name
    pub name: String,
    /// Display text
    #[serde(default)]
    pub description: String,
    /// Only one upgrade per slot may be applied to a unit
    pub slot: u32,
    /// Point cost
    pub points: u32,
    /// Additive stat bonus
    pub bonus: UnitStats,
}

/// A kind of unit a faction can field
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnitType {
    /// Display name
    pub name: String,
    /// Point cost without upgrades
    pub points: u32,
    /// Maximum number of this type per army
    #[serde(default)]
    pub limit: Option<u32>,
    /// Category
    pub class: UnitClass,
    /// 0 is fully soft, 1 is fully hard
    #[serde(default)]
    pub hardness: f64,
    /// Base stats
    pub stats: UnitStats,
    /// Available upgrades
    #[serde(default)]
    pub upgrades: Vec<UnitUpgrade>,
}

/// A side's roster of unit types
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Faction {
    /// Display name
    pub name: String,
    /// Display text
    #[serde(default)]
    pub description: String,
    /// Unit types, indexed by unit type id
    pub units: Vec<Arc<UnitType>>,
}

impl Faction {
    /// Look up a unit type by index
    pub fn unit_type(&self, unit_type: usize) -> Result<&Arc<UnitType>, GameError> {
        self.units.get(unit_type).ok_or(GameError::NoSuchUnitType)
    }
}

/// Stats of a unit type with upgrades, terrain and entrenchment applied
pub fn compute_stats(
    unit_type: &UnitType,
    upgrades: &[usize],
    terrain: Option<TerrainType>,
    entrenched: bool,
) -> UnitStats {
    let mut stats = unit_type.stats.clone();
    for upgrade in upgrades.iter().filter_map(|&index| unit_type.upgrades.get(index)) {
        stats += &upgrade.bonus;
    }
    if let Some(terrain) = terrain {
        stats += &terrain.defence_bonus();
    }
    if entrenched {
        stats += &UnitStats::entrenchment_bonus();
    }
    stats
}

/// A unit in a game
#[derive(Debug, Clone)]
pub struct Unit {
    /// Which side this belongs to
    pub owner: PlayerId,
    /// Unique within the game
    pub id: UnitId,
    /// Index of the owner's faction
    pub faction: usize,
    /// Index of the unit type in the faction
    pub unit_type_id: usize,
    /// The unit type
    pub unit_type: Arc<UnitType>,
    /// Indices of applied upgrades
    pub upgrades: Vec<usize>,
    /// Derived stats; see [`compute_stats`]
    pub stats: UnitStats,
    /// Point cost including upgrades
    pub points: u32,
    /// Is this on the map (always true for air units)
    pub deployed: bool,
    /// Current hex; air units never have one
    pub hex: Option<Position>,
    terrain: Option<TerrainType>,
    /// In [0, 1]
    pub strength: f64,
    /// Movement points left this turn
    pub movement_points: i32,
    /// Can this still attack or reinforce this turn
    pub can_act: bool,
    /// Is this dug in
    pub entrenched: bool,
    /// Consecutive turns spent out of supply
    pub attrition_duration: u32,
}

impl Unit {
    /// Build a fresh, undeployed unit at full strength
    pub fn new(
        owner: PlayerId,
        id: UnitId,
        faction: usize,
        unit_type_id: usize,
        unit_type: Arc<UnitType>,
        upgrades: Vec<usize>,
    ) -> Result<Self, GameError> {
        let mut slots = HashSet::new();
        let mut points = unit_type.points;
        for &index in &upgrades {
            let upgrade = unit_type.upgrades.get(index).ok_or(GameError::NoSuchUpgrade)?;
            if !slots.insert(upgrade.slot) {
                return Err(GameError::UpgradeSlotOccupied(upgrade.slot));
            }
            points += upgrade.points;
        }

        let stats = compute_stats(&unit_type, &upgrades, None, false);
        let deployed = unit_type.class == UnitClass::Air;
        let mut unit = Self {
            owner,
            id,
            faction,
            unit_type_id,
            unit_type,
            upgrades,
            stats,
            points,
            deployed,
            hex: None,
            terrain: None,
            strength: 1.0,
            movement_points: 0,
            can_act: true,
            entrenched: false,
            attrition_duration: 0,
        };
        unit.reset_for_new_turn();
        Ok(unit)
    }

    fn recompute_stats(&mut self) {
        self.stats = compute_stats(&self.unit_type, &self.upgrades, self.terrain, self.entrenched);
    }

    /// Is this an aircraft
    pub fn is_air(&self) -> bool {
        self.unit_type.class == UnitClass::Air
    }

    /// Does this have some flag, including flags granted by upgrades
    pub fn has_flag(&self, flag: UnitFlag) -> bool {
        self.stats.has_flag(flag)
    }

    /// Is this still in the fight
    pub fn is_alive(&self) -> bool {
        self.strength > 0.0
    }

    /// Movement points at the start of a turn
    pub fn full_movement(&self) -> i32 {
        self.stats.movement
    }

    /// Has this spent any movement this turn
    pub fn has_moved(&self) -> bool {
        self.movement_points < self.full_movement()
    }

    /// Restore per-turn budgets
    pub fn reset_for_new_turn(&mut self) {
        self.movement_points = self.full_movement();
        self.can_act = true;
    }

    /// Put this on a hex; clears entrenchment
    pub fn place(&mut self, position: Position, terrain: TerrainType) {
        self.deployed = true;
        self.hex = Some(position);
        self.terrain = Some(terrain);
        self.entrenched = false;
        self.recompute_stats();
    }

    /// Take this off the map
    pub fn withdraw(&mut self) {
        self.deployed = self.is_air();
        self.hex = None;
        self.terrain = None;
        self.entrenched = false;
        self.recompute_stats();
    }

    /// Can this dig in right now
    pub fn can_entrench(&self) -> bool {
        self.unit_type.class == UnitClass::Infantry
            && self.deployed
            && !self.entrenched
            && self.can_act
            && !self.has_moved()
    }

    /// Dig in, spending the rest of this turn's movement
    pub fn entrench(&mut self) {
        self.entrenched = true;
        self.movement_points = 0;
        self.recompute_stats();
    }

    /// Leave entrenchment
    pub fn break_entrenchment(&mut self) {
        if self.entrenched {
            self.entrenched = false;
            self.recompute_stats();
        }
    }

    /// Apply an upgrade mid-game
    pub fn upgrade(&mut self, index: usize) -> Result<u32, GameError> {
        let upgrade = self
            .unit_type
            .upgrades
            .get(index)
            .ok_or(GameError::NoSuchUpgrade)?;
        if self
            .upgrades
            .iter()
            .filter_map(|&applied| self.unit_type.upgrades.get(applied))
            .any(|applied| applied.slot == upgrade.slot)
        {
            return Err(GameError::UpgradeSlotOccupied(upgrade.slot));
        }
        let cost = upgrade.points;
        self.upgrades.push(index);
        self.points += cost;
        self.recompute_stats();
        Ok(cost)
    }

    /// Stats as seen by an engineer, without the entrenchment bonus
    pub fn stats_ignoring_entrenchment(&self) -> UnitStats {
        compute_stats(&self.unit_type, &self.upgrades, self.terrain, false)
    }

    /// Base damage against a target of some hardness
    ///
    /// Attackers use their attack values, defenders fire back with their
    /// defence values
    pub fn damage_against(stats: &UnitStats, target_hardness: f64, attacking: bool) -> f64 {
        let softness = 1.0 - target_hardness;
        if attacking {
            stats.soft_attack as f64 * softness + stats.hard_attack as f64 * target_hardness
        } else {
            stats.soft_defence as f64 * softness + stats.hard_defence as f64 * target_hardness
        }
    }

    /// Strength lost per turn out of supply
    pub fn attrition_rate(&self) -> f64 {
        match self.unit_type.class {
            UnitClass::Infantry => INFANTRY_ATTRITION_RATE,
            UnitClass::Motorized | UnitClass::Air => MOTORIZED_ATTRITION_RATE,
        }
    }

    /// Lose strength to attrition and the action for this turn
    pub fn take_attrition_damage(&mut self) {
        self.strength -= self.attrition_rate();
        if self.strength < MINIMUM_STRENGTH {
            self.strength = 0.0;
        }
        self.can_act = false;
    }

    /// Largest strength gain from one reinforcement
    pub fn reinforcement_cap(&self) -> f64 {
        match self.unit_type.class {
            UnitClass::Infantry => INFANTRY_REINFORCEMENT_CAP,
            UnitClass::Motorized | UnitClass::Air => MOTORIZED_REINFORCEMENT_CAP,
        }
    }
}

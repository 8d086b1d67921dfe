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

//! The hex map: topology, movement, capture and supply

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{
    PlayerId, Position, UnitId,
    constants::INDIRECT_CAPTURE_LIMIT,
    error::MapError,
    unit::{Unit, UnitFlag, UnitStats},
};

/// Kind of ground a hex is made of
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainType {
    /// Open ground
    Clear,
    /// Woods
    Forest,
    /// Mountains
    Mountain,
    /// Wetlands
    Swamp,
    /// Hills
    Hill,
}

impl TerrainType {
    /// Movement points needed to enter
    pub fn movement_cost(self) -> i32 {
        match self {
            TerrainType::Clear => 1,
            TerrainType::Forest => 2,
            TerrainType::Mountain => 3,
            TerrainType::Swamp => 2,
            TerrainType::Hill => 2,
        }
    }

    /// Bonus to units standing on this terrain
    pub fn defence_bonus(self) -> UnitStats {
        let (soft_defence, hard_defence, bombardment_defence) = match self {
            TerrainType::Clear => (0, 0, 0),
            TerrainType::Forest => (1, 1, 2),
            TerrainType::Mountain => (2, 2, 2),
            TerrainType::Swamp => (1, 2, 0),
            TerrainType::Hill => (1, 1, 0),
        };
        UnitStats {
            soft_defence,
            hard_defence,
            bombardment_defence,
            ..Default::default()
        }
    }
}

/// A river along the edge between two neighbouring hexes
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct River {
    /// One side
    pub from: Position,
    /// The other side
    pub to: Position,
    /// Bridged rivers are crossed at normal cost
    #[serde(default)]
    pub bridge: bool,
}

/// The unit standing on a hex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    /// Owner of the unit
    pub owner: PlayerId,
    /// The unit; look it up in the owner's roster
    pub unit: UnitId,
}

/// One cell of the map
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Hex {
    /// Where this is
    pub position: Position,
    /// What this is made of
    pub terrain: TerrainType,
    /// Whose initial deployment zone this is part of
    #[serde(default)]
    pub initial_deployment_zone: Option<PlayerId>,
    /// Who controls this
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// Whose supply network originates here
    #[serde(default)]
    pub supply: Option<PlayerId>,
    /// River index per direction
    #[serde(skip)]
    rivers: [Option<usize>; 6],
    /// Who stands here
    #[serde(skip)]
    pub unit: Option<Occupant>,
}

impl Hex {
    /// A hex with no owner, zone, supply or rivers
    pub fn new(position: Position, terrain: TerrainType) -> Self {
        Self {
            position,
            terrain,
            initial_deployment_zone: None,
            owner: None,
            supply: None,
            rivers: [None; 6],
            unit: None,
        }
    }
}

/// The shortest known way to reach a hex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Hexes entered, in order, excluding the start
    pub hexes: Vec<Position>,
    /// Movement points left on arrival
    pub movement_points_left: i32,
}

#[derive(Serialize, Deserialize)]
struct MapData {
    name: String,
    hexes: Vec<Hex>,
    #[serde(default)]
    rivers: Vec<River>,
}

/// A game board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MapData", into = "MapData")]
pub struct Map {
    name: String,
    hexes: Vec<Hex>,
    index: HashMap<Position, usize>,
    rivers: Vec<River>,
}

impl TryFrom<MapData> for Map {
    type Error = MapError;

    fn try_from(value: MapData) -> Result<Self, Self::Error> {
        Map::new(value.name, value.hexes, value.rivers)
    }
}

impl From<Map> for MapData {
    fn from(value: Map) -> Self {
        Self {
            name: value.name,
            hexes: value.hexes,
            rivers: value.rivers,
        }
    }
}

impl Map {
    /// Build a map, checking topology and attaching rivers to both banks
    ///
    /// Hexes with no owner start owned by their deployment zone's player
    pub fn new(name: String, mut hexes: Vec<Hex>, rivers: Vec<River>) -> Result<Self, MapError> {
        let mut index = HashMap::new();
        for (i, hex) in hexes.iter_mut().enumerate() {
            if index.insert(hex.position, i).is_some() {
                return Err(MapError::DuplicateHex(hex.position));
            }
            hex.rivers = [None; 6];
            hex.unit = None;
            if hex.owner.is_none() {
                hex.owner = hex.initial_deployment_zone;
            }
        }

        for (i, river) in rivers.iter().enumerate() {
            let (Some(&from), Some(&to)) = (index.get(&river.from), index.get(&river.to)) else {
                return Err(MapError::RiverOutsideMap(river.from, river.to));
            };
            let direction = (0..6)
                .find(|&direction| river.from.neighbour(direction) == river.to)
                .ok_or(MapError::RiverNotAdjacent(river.from, river.to))?;
            hexes[from].rivers[direction] = Some(i);
            hexes[to].rivers[(direction + 3) % 6] = Some(i);
        }

        Ok(Self {
            name,
            hexes,
            index,
            rivers,
        })
    }

    /// Name used to pick this map in a game configuration
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All hexes
    pub fn hexes(&self) -> &[Hex] {
        &self.hexes
    }

    /// Look up a hex
    pub fn hex(&self, position: Position) -> Option<&Hex> {
        self.index.get(&position).map(|&i| &self.hexes[i])
    }

    fn hex_mut(&mut self, position: Position) -> Option<&mut Hex> {
        self.index.get(&position).map(|&i| &mut self.hexes[i])
    }

    /// The river crossed when leaving a hex in some direction
    pub fn river(&self, position: Position, direction: usize) -> Option<&River> {
        self.hex(position)?.rivers[direction].map(|i| &self.rivers[i])
    }

    /// Put a unit on a hex
    ///
    /// Callers check that the hex exists and is empty
    pub fn place_unit(&mut self, position: Position, owner: PlayerId, unit: UnitId) {
        if let Some(hex) = self.hex_mut(position) {
            hex.unit = Some(Occupant { owner, unit });
        }
    }

    /// Clear a hex's occupant
    pub fn remove_unit(&mut self, position: Position) {
        if let Some(hex) = self.hex_mut(position) {
            hex.unit = None;
        }
    }

    /// Every hex a unit can end its move on this turn, with the best path there
    ///
    /// Enemy units block movement; friendly units can be passed through but
    /// not stopped on. Crossing a river without a bridge takes a whole turn's
    /// movement and is only possible before moving at all.
    pub fn movement_map(&self, unit: &Unit) -> HashMap<Position, Path> {
        let mut paths: HashMap<Position, Path> = HashMap::new();
        let Some(start) = unit.hex else {
            return paths;
        };
        let full_movement = unit.full_movement();
        let amphibious = unit.has_flag(UnitFlag::Amphibious);

        let mut queue = VecDeque::from([Path {
            hexes: Vec::new(),
            movement_points_left: unit.movement_points,
        }]);
        while let Some(path) = queue.pop_front() {
            let current = path.hexes.last().copied().unwrap_or(start);
            if paths
                .get(&current)
                .is_some_and(|known| known.movement_points_left > path.movement_points_left)
            {
                // superseded while queued
                continue;
            }

            for direction in 0..6 {
                let next = current.neighbour(direction);
                if next == start {
                    continue;
                }
                let Some(neighbour) = self.hex(next) else {
                    continue;
                };
                if neighbour
                    .unit
                    .is_some_and(|occupant| occupant.owner != unit.owner)
                {
                    continue;
                }

                let cost = match self.river(current, direction) {
                    Some(river) if !river.bridge && !amphibious => {
                        if path.movement_points_left != full_movement {
                            continue;
                        }
                        full_movement
                    }
                    _ => neighbour.terrain.movement_cost(),
                };
                let left = path.movement_points_left - cost;
                if left < 0 {
                    continue;
                }
                if paths
                    .get(&next)
                    .is_some_and(|known| known.movement_points_left >= left)
                {
                    continue;
                }

                let mut hexes = path.hexes.clone();
                hexes.push(next);
                let improved = Path {
                    hexes,
                    movement_points_left: left,
                };
                paths.insert(next, improved.clone());
                queue.push_back(improved);
            }
        }

        paths.retain(|&position, _| self.hex(position).is_some_and(|hex| hex.unit.is_none()));
        paths
    }

    /// Capture the hexes along a path, plus any pockets they enclose
    ///
    /// Returns every hex whose owner changed
    pub fn capture(&mut self, path: &[Position], player: PlayerId) -> Vec<Position> {
        let mut captures = Vec::new();
        for &position in path {
            let Some(hex) = self.hex_mut(position) else {
                continue;
            };
            if hex.owner == Some(player) {
                continue;
            }
            hex.owner = Some(player);
            captures.push(position);

            for neighbour in position.neighbours() {
                let Some(region) = self.indirectly_captured_region(neighbour, player) else {
                    continue;
                };
                for captured in region {
                    if let Some(hex) = self.hex_mut(captured) {
                        hex.owner = Some(player);
                        captures.push(captured);
                    }
                }
            }
        }
        captures
    }

    /// The connected region of hexes not owned by `player` containing `start`,
    /// if it is small enough and empty enough to be captured in bulk
    pub fn indirectly_captured_region(
        &self,
        start: Position,
        player: PlayerId,
    ) -> Option<Vec<Position>> {
        let hex = self.hex(start)?;
        if hex.owner == Some(player) {
            return None;
        }

        let mut scanned = HashSet::from([start]);
        let mut stack = vec![start];
        let mut region = Vec::new();
        while let Some(position) = stack.pop() {
            let hex = self.hex(position)?;
            if hex.unit.is_some() {
                return None;
            }
            region.push(position);
            if region.len() > INDIRECT_CAPTURE_LIMIT {
                return None;
            }
            for neighbour in position.neighbours() {
                let unowned = self
                    .hex(neighbour)
                    .is_some_and(|hex| hex.owner != Some(player));
                if unowned && scanned.insert(neighbour) {
                    stack.push(neighbour);
                }
            }
        }
        Some(region)
    }

    /// Hexes connected to one of the player's supply sources through hexes
    /// the player owns
    pub fn supply_network(&self, player: PlayerId) -> HashSet<Position> {
        let mut network: HashSet<Position> = self
            .hexes
            .iter()
            .filter(|hex| hex.supply == Some(player) && hex.owner == Some(player))
            .map(|hex| hex.position)
            .collect();
        let mut frontier: Vec<Position> = network.iter().copied().collect();
        while let Some(position) = frontier.pop() {
            for neighbour in position.neighbours() {
                let owned = self
                    .hex(neighbour)
                    .is_some_and(|hex| hex.owner == Some(player));
                if owned && network.insert(neighbour) {
                    frontier.push(neighbour);
                }
            }
        }
        network
    }

    /// Number of hexes a player owns
    pub fn map_control(&self, player: PlayerId) -> usize {
        self.hexes
            .iter()
            .filter(|hex| hex.owner == Some(player))
            .count()
    }
}

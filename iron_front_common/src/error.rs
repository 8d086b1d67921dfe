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

//! Error types
//!
//! A [`GameError`] is always the client's fault; its message is sent back to
//! the offending connection verbatim

use thiserror::Error;

use crate::{Position, UnitId};

/// A rule violation by a client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Unit id not in the player's roster
    #[error("no unit {0} in this army")]
    UnitNotFound(UnitId),
    /// Deploying a unit twice
    #[error("unit {0} has already been deployed")]
    AlreadyDeployed(UnitId),
    /// Using a unit that is not on the map
    #[error("unit {0} has not been deployed")]
    NotDeployed(UnitId),
    /// Deploying outside the player's initial deployment zone
    #[error("{0} is not in the deployment zone")]
    OutsideDeploymentZone(Position),
    /// Deploying into a zone the player has lost
    #[error("deployment zone {0} is not currently controlled by the player")]
    NotControlled(Position),
    /// Target hex already holds a unit
    #[error("{0} is already occupied")]
    HexOccupied(Position),
    /// Position not on the map
    #[error("{0} is not on the map")]
    InvalidPosition(Position),
    /// Destination not in the unit's movement map
    #[error("unit {0} cannot reach {1}")]
    Unreachable(UnitId, Position),
    /// Entrenchment preconditions not met
    #[error("unit {0} cannot entrench")]
    CannotEntrench(UnitId),
    /// Unit has used its action
    #[error("unit {0} cannot perform any more actions this turn")]
    CannotAct(UnitId),
    /// Target beyond the attacker's range
    #[error("the target is out of range")]
    OutOfRange,
    /// Air units occupy no hex
    #[error("air units cannot be attacked")]
    AirTarget,
    /// Artillery moved this turn
    #[error("artillery cannot attack after moving")]
    ArtilleryMoved,
    /// Reinforcing a unit outside the supply network
    #[error("unit {0} is out of supply")]
    OutOfSupply(UnitId),
    /// Reinforcing a unit that moved
    #[error("unit {0} has already moved this turn")]
    AlreadyMoved(UnitId),
    /// Reinforcing a full-strength unit
    #[error("unit {0} is already at full strength")]
    FullStrength(UnitId),
    /// Not enough reinforcement points
    #[error("not enough reinforcement points")]
    InsufficientPoints,
    /// Two upgrades in one slot
    #[error("upgrade slot {0} is already occupied")]
    UpgradeSlotOccupied(u32),
    /// Upgrade index out of range
    #[error("no such upgrade")]
    NoSuchUpgrade,
    /// Faction index out of range
    #[error("no such faction")]
    NoSuchFaction,
    /// Unit type index out of range
    #[error("no such unit type")]
    NoSuchUnitType,
    /// Unit from a different faction
    #[error("units must belong to the army's faction")]
    WrongFaction,
    /// Army with no units
    #[error("cannot play with an empty army")]
    EmptyArmy,
    /// Army over budget
    #[error("the army costs {spent} points but only {available} are available")]
    TooManyPoints {
        /// Cost of the army
        spent: u32,
        /// Points budget
        available: u32,
    },
    /// Too many units of a limited type
    #[error("too many units of type {0}")]
    UnitLimitExceeded(String),
    /// Unknown map name
    #[error("no such map")]
    NoSuchMap,
    /// Game configuration out of range
    #[error("invalid game configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// A map file breaks a topology invariant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// Two hexes at one position
    #[error("hex {0} appears more than once")]
    DuplicateHex(Position),
    /// River edge touching a missing hex
    #[error("river from {0} to {1} leaves the map")]
    RiverOutsideMap(Position, Position),
    /// River edge between non-neighbours
    #[error("river from {0} to {1} does not join neighbours")]
    RiverNotAdjacent(Position, Position),
}

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

//! Game rules and protocol messages for Iron Front
//!
//! Holds no networking code; the server drives everything in here under its
//! own lock

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{
    fmt::{self, Display, Formatter},
    marker::PhantomData,
    ops::{Add, Sub},
};

use num_traits::PrimInt;
use serde::{Deserialize, Serialize};

pub mod combat;
pub mod constants;
pub mod error;
pub mod game;
pub mod map;
pub mod message;
pub mod player;
pub mod unit;

/// One of the two sides of a match
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerId {
    /// The player that created the game
    Player1,
    /// The player that joined the game
    Player2,
}

impl PlayerId {
    /// Both players, in index order
    pub const ALL: [PlayerId; 2] = [PlayerId::Player1, PlayerId::Player2];

    /// The other side
    pub fn opponent(self) -> Self {
        match self {
            PlayerId::Player1 => PlayerId::Player2,
            PlayerId::Player2 => PlayerId::Player1,
        }
    }

    /// Index into per-player arrays
    pub fn index(self) -> usize {
        match self {
            PlayerId::Player1 => 0,
            PlayerId::Player2 => 1,
        }
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::Player1 => write!(f, "player 1"),
            PlayerId::Player2 => write!(f, "player 2"),
        }
    }
}

/// A hex-grid axial position
///
/// The third axial coordinate is derived as `z = -x - y`
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// First axial coordinate
    pub x: i32,
    /// Second axial coordinate
    pub y: i32,
}

/// Offsets to the six neighbours, in direction order
///
/// Direction `d` and direction `(d + 3) % 6` are opposite each other
pub const DIRECTIONS: [Position; 6] = [
    Position { x: 0, y: -1 },
    Position { x: 1, y: -1 },
    Position { x: 1, y: 0 },
    Position { x: 0, y: 1 },
    Position { x: -1, y: 1 },
    Position { x: -1, y: 0 },
];

impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}
impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
impl Position {
    /// Create a position
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The derived third axial coordinate
    pub fn z(&self) -> i32 {
        -self.x - self.y
    }

    /// The neighbour in some direction
    pub fn neighbour(&self, direction: usize) -> Self {
        *self + DIRECTIONS[direction]
    }

    /// Get the neighbours of this position, in direction order
    pub fn neighbours(&self) -> [Self; 6] {
        DIRECTIONS.map(|offset| *self + offset)
    }

    /// Distance to another position, in hexes
    pub fn distance(&self, other: &Self) -> i32 {
        let offset = *other - *self;
        offset.x.abs().max(offset.y.abs()).max(offset.z().abs())
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Identifies a unit within one game
#[repr(transparent)]
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl From<u32> for UnitId {
    fn from(value: u32) -> Self {
        UnitId(value)
    }
}

impl From<UnitId> for u32 {
    fn from(value: UnitId) -> Self {
        value.0
    }
}

impl Display for UnitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out monotonically increasing ids, starting at one
#[derive(Debug, Clone)]
pub struct IdGenerator<T: From<U>, U: PrimInt> {
    next: U,
    _t: PhantomData<T>,
}
impl<T: From<U>, U: PrimInt> Default for IdGenerator<T, U> {
    fn default() -> Self {
        Self {
            next: U::one(),
            _t: PhantomData,
        }
    }
}
impl<T: From<U>, U: PrimInt> Iterator for IdGenerator<T, U> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let result: Option<T> = Some(self.next.into());
        self.next = self.next + U::one();
        result
    }
}

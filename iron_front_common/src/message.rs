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

//! Protocol messages
//!
//! Each WebSocket binary frame carries exactly one CBOR-encoded message

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use strum::EnumDiscriminants;

use crate::{
    PlayerId, Position, UnitId,
    game::{GameConfiguration, GameEnd},
    unit::Faction,
};

/// Bumped whenever a message changes shape
pub const PROTOCOL_VERSION: u32 = 1;

/// Identifies a game offer on a server
#[repr(transparent)]
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(u32);

impl From<u32> for GameId {
    fn from(value: u32) -> Self {
        GameId(value)
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "game {}", self.0)
    }
}

/// A unit to build, or a built unit when `unit` is set
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UnitConfiguration {
    /// Assigned by the server
    #[serde(default)]
    pub unit: Option<UnitId>,
    /// Index of the faction
    pub faction: usize,
    /// Index of the unit type in the faction
    pub unit_type: usize,
    /// Indices of upgrades
    #[serde(default)]
    pub upgrades: Vec<usize>,
}

/// An army as chosen before a game
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BaseArmy {
    /// Index of the faction
    pub faction: usize,
    /// The units
    pub units: Vec<UnitConfiguration>,
}

/// Where a unit stands
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct UnitPosition {
    /// The unit
    pub unit: UnitId,
    /// Its hex
    pub position: Position,
}

/// A unit worn down by attrition
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct UnitCasualties {
    /// The unit
    pub unit: UnitId,
    /// Strength left; zero if destroyed
    pub strength: f64,
    /// Whether it may still act this turn
    pub can_act: bool,
}

/// A game offer in the public list
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PublicGame {
    /// Pass this back to join
    pub id: GameId,
    /// Name of the player that made the offer
    pub owner: String,
    /// Terms of the game
    pub configuration: GameConfiguration,
}

/// Answer to a login attempt
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum LoginResult {
    /// Logged in; here is the content the server plays with
    Success {
        /// Available factions
        factions: Vec<Arc<Faction>>,
        /// Names of available maps
        maps: Vec<String>,
    },
    /// Client speaks another protocol version
    WrongVersion,
    /// Name is empty
    EmptyName,
    /// Name is over the server's limit
    NameTooLong,
    /// Another logged in player has this name
    NameTaken,
}

/// Answer to a join attempt
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum JoinGameResult {
    /// Joined; a game start follows
    Success,
    /// The offer no longer exists
    NoSuchGame,
}

/// Sent by clients
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ClientMessageKind), derive(Hash))]
#[strum_discriminants(doc = "Tag of a [`ClientMessage`]")]
pub enum ClientMessage {
    /// First message on a connection
    Login {
        /// Must equal [`PROTOCOL_VERSION`]
        version: u32,
        /// Display name
        name: String,
    },
    /// Offer a game
    CreateGame {
        /// Terms of the game
        configuration: GameConfiguration,
        /// Creator's army
        army: BaseArmy,
        /// Keep out of the public list and hand back a key
        private: bool,
    },
    /// List public offers
    ViewPublicGames,
    /// Accept a public offer
    JoinPublicGame {
        /// Offer to accept
        game: GameId,
        /// Joiner's army
        army: BaseArmy,
    },
    /// Accept a private offer
    JoinPrivateGame {
        /// Key handed to the creator
        key: String,
        /// Joiner's army
        army: BaseArmy,
    },
    /// Withdraw an offer
    CancelGame,
    /// Place units before the first turn; replaces any earlier submission
    InitialDeployment {
        /// Placements
        units: Vec<UnitPosition>,
        /// Ask to move first
        requested_first_turn: bool,
    },
    /// Move a unit
    MoveUnit {
        /// The unit
        unit: UnitId,
        /// Where to
        destination: Position,
    },
    /// Dig a unit in
    EntrenchUnit {
        /// The unit
        unit: UnitId,
    },
    /// Attack an enemy unit
    AttackUnit {
        /// Own unit
        attacker: UnitId,
        /// Enemy unit
        defender: UnitId,
    },
    /// Place a held-back unit
    DeployUnit {
        /// The unit
        unit: UnitId,
        /// Where to
        position: Position,
    },
    /// Restore a unit's strength
    ReinforceUnit {
        /// The unit
        unit: UnitId,
    },
    /// Build a new unit
    PurchaseUnit {
        /// What to build
        unit: UnitConfiguration,
    },
    /// Upgrade a unit
    UpgradeUnit {
        /// The unit
        unit: UnitId,
        /// Index of the upgrade
        upgrade: usize,
    },
    /// Hand the turn over
    EndTurn,
    /// Concede
    Surrender,
    /// Something went wrong on the client's end
    Error {
        /// Human readable
        message: String,
    },
}

/// Sent by the server
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerMessage {
    /// Answer to [`ClientMessage::Login`]
    LoginReply(LoginResult),
    /// Answer to [`ClientMessage::CreateGame`]
    CreateGameReply {
        /// Key to share with the opponent, for private games
        private_key: Option<String>,
    },
    /// Answer to [`ClientMessage::ViewPublicGames`]
    PublicGames(Vec<PublicGame>),
    /// Answer to a join attempt
    JoinGameReply(JoinGameResult),
    /// The offer was withdrawn
    GameCancelled,
    /// An opponent was found; deploy now
    GameStart {
        /// Which side the recipient plays
        identifier: PlayerId,
        /// Terms of the game
        configuration: GameConfiguration,
        /// Opponent's display name
        opponent_name: String,
        /// Recipient's army, with unit ids
        army: BaseArmy,
        /// Opponent's army, with unit ids
        opponent_army: BaseArmy,
        /// Recipient's reinforcement points
        reinforcement_points: u32,
    },
    /// Both deployments are final; here is where the opponent stands
    OpponentDeployment(Vec<UnitPosition>),
    /// A turn began
    NewTurn {
        /// Number of the turn, starting at 1
        turn: u32,
        /// Who may act
        active: PlayerId,
        /// Units worn down by attrition, from both sides
        attrition: Vec<UnitCasualties>,
    },
    /// A unit moved
    UnitMoved {
        /// Owner
        player: PlayerId,
        /// The unit
        unit: UnitId,
        /// Where it went
        destination: Position,
        /// Movement points it has left
        movement_points: i32,
        /// Hexes that changed hands
        captures: Vec<Position>,
    },
    /// A unit dug in
    UnitEntrenched {
        /// Owner
        player: PlayerId,
        /// The unit
        unit: UnitId,
    },
    /// A fight took place
    UnitAttacked {
        /// Attacking side
        player: PlayerId,
        /// Attacking unit
        attacker: UnitId,
        /// Defending unit
        defender: UnitId,
        /// Attacker's strength afterwards; zero if destroyed
        attacker_strength: f64,
        /// Defender's strength afterwards; zero if destroyed
        defender_strength: f64,
    },
    /// A held-back unit was placed
    UnitDeployed {
        /// Owner
        player: PlayerId,
        /// The unit
        unit: UnitId,
        /// Where
        position: Position,
    },
    /// A unit was reinforced
    UnitReinforced {
        /// Owner
        player: PlayerId,
        /// The unit
        unit: UnitId,
        /// New strength
        strength: f64,
        /// Owner's points left
        reinforcement_points: u32,
    },
    /// A unit was built
    UnitPurchased {
        /// Owner
        player: PlayerId,
        /// The new unit, with its id
        unit: UnitConfiguration,
        /// Owner's points left
        reinforcement_points: u32,
    },
    /// A unit was upgraded
    UnitUpgraded {
        /// Owner
        player: PlayerId,
        /// The unit
        unit: UnitId,
        /// Index of the upgrade
        upgrade: usize,
        /// Owner's points left
        reinforcement_points: u32,
    },
    /// The game is over
    GameEnd(GameEnd),
    /// The recipient broke a rule; the connection closes after this
    Error {
        /// Human readable
        message: String,
    },
}

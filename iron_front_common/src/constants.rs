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

//! Tuning constants for the game rules

use std::ops::RangeInclusive;

/// Fraction of unspent army points converted into reinforcement points
pub const REINFORCEMENT_POINTS_PENALTY_FACTOR: f64 = 0.5;
/// Fraction of the points budget always granted as reinforcement points
pub const REINFORCEMENT_POINTS_BASE_RATIO: f64 = 0.3;

/// Mean of the combat efficiency distribution
pub const COMBAT_EFFICIENCY_MEAN: f64 = 1.0;
/// Standard deviation of the combat efficiency distribution
pub const COMBAT_EFFICIENCY_DEVIATION: f64 = 0.1;

/// Ground combat runs until the side that dealt less damage has dealt more than this
pub const LOWER_TARGET_DAMAGE: f64 = 0.1;
/// Ground combat runs until the side that dealt more damage has dealt more than this
pub const HIGHER_TARGET_DAMAGE: f64 = 0.3;

/// Damage per attack point per round at full strength
pub const DAMAGE_MITIGATION: f64 = 1.0 / 200.0;
/// Exponent applied to strength when computing damage
pub const STRENGTH_EXPONENT: f64 = 0.95;
/// Units below this strength are destroyed
pub const MINIMUM_STRENGTH: f64 = 0.05;

/// Floor of the bombardment efficiency factor
pub const BOMBARDMENT_EFFICIENCY_MINIMUM: f64 = 0.3;
/// Rounds in an artillery or air attack
pub const BOMBARDMENT_ATTACKS: u32 = 25;
/// Floor of the anti-air efficiency factor
pub const ANTI_AIR_EFFICIENCY_MINIMUM: f64 = 0.5;

/// Largest region that can be captured indirectly
pub const INDIRECT_CAPTURE_LIMIT: usize = 3;

/// Strength lost per turn of attrition by infantry
pub const INFANTRY_ATTRITION_RATE: f64 = 0.05;
/// Strength lost per turn of attrition by motorized units
pub const MOTORIZED_ATTRITION_RATE: f64 = 0.1;

/// Strength restored by one reinforcement of an infantry unit
pub const INFANTRY_REINFORCEMENT_CAP: f64 = 0.4;
/// Strength restored by one reinforcement of a motorized or air unit
pub const MOTORIZED_REINFORCEMENT_CAP: f64 = 0.2;

/// Legal army point budgets
pub const POINTS_RANGE: RangeInclusive<u32> = 100..=10000;
/// Legal turn limits
pub const TURN_LIMIT_RANGE: RangeInclusive<u32> = 1..=100;
/// Legal deployment time limits, in seconds
pub const DEPLOYMENT_TIME_RANGE: RangeInclusive<u32> = 10..=600;
/// Legal turn time limits, in seconds
pub const TURN_TIME_RANGE: RangeInclusive<u32> = 10..=600;

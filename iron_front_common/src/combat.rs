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

//! Combat resolution
//!
//! Works on copies of both units' strengths; the caller writes the outcome
//! back onto the real units

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::Open01;

use crate::{
    constants::{
        ANTI_AIR_EFFICIENCY_MINIMUM, BOMBARDMENT_ATTACKS, BOMBARDMENT_EFFICIENCY_MINIMUM,
        COMBAT_EFFICIENCY_DEVIATION, COMBAT_EFFICIENCY_MEAN, DAMAGE_MITIGATION,
        HIGHER_TARGET_DAMAGE, LOWER_TARGET_DAMAGE, MINIMUM_STRENGTH, STRENGTH_EXPONENT,
    },
    unit::{Unit, UnitFlag},
};

/// Normally distributed samples via the Box-Muller transform
///
/// Each transform yields two deviates; the second is kept for the next call
#[derive(Debug, Clone)]
pub struct NormalDistribution {
    mean: f64,
    deviation: f64,
    cached: Option<f64>,
}

impl NormalDistribution {
    /// Create a distribution
    pub fn new(mean: f64, deviation: f64) -> Self {
        Self {
            mean,
            deviation,
            cached: None,
        }
    }

    /// Draw a sample
    pub fn sample(&mut self, rng: &mut impl Rng) -> f64 {
        if let Some(value) = self.cached.take() {
            return value;
        }
        let u1: f64 = rng.sample(Open01);
        let u2: f64 = rng.sample(Open01);
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        self.cached = Some(self.adjust(r * theta.sin()));
        self.adjust(r * theta.cos())
    }

    fn adjust(&self, x: f64) -> f64 {
        self.mean + self.deviation * x
    }
}

/// How a fight plays out, decided by the attacker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackType {
    /// Both sides trade fire until casualty targets are met
    Ground,
    /// Only the attacker fires, for a fixed number of rounds
    Artillery,
    /// As artillery, but nearby anti-air units fire back
    Air,
}

impl AttackType {
    /// The kind of attack a unit makes
    pub fn of(attacker: &Unit) -> Self {
        if attacker.is_air() {
            AttackType::Air
        } else if attacker.has_flag(UnitFlag::Artillery) {
            AttackType::Artillery
        } else {
            AttackType::Ground
        }
    }
}

/// Result of a fight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatOutcome {
    /// How the fight was run
    pub attack_type: AttackType,
    /// Attacker's strength afterwards
    pub attacker_strength: f64,
    /// Defender's strength afterwards
    pub defender_strength: f64,
    /// Rounds fought
    pub rounds: u32,
}

#[derive(Debug)]
struct Combatant {
    strength: f64,
    base_damage: f64,
    efficiency: f64,
    divisor: f64,
    damage_dealt: f64,
}

impl Combatant {
    fn new(strength: f64, base_damage: f64, efficiency: f64) -> Self {
        Self {
            strength,
            base_damage,
            efficiency: efficiency.max(0.0),
            divisor: 1.0,
            damage_dealt: 0.0,
        }
    }

    fn with_divisor(mut self, divisor: i32) -> Self {
        self.divisor = divisor.max(1) as f64;
        self
    }

    fn is_alive(&self) -> bool {
        self.strength > 0.0
    }

    fn fire(&mut self) -> f64 {
        let damage = self.strength.powf(STRENGTH_EXPONENT)
            * self.base_damage
            * self.efficiency
            * DAMAGE_MITIGATION
            / self.divisor;
        self.damage_dealt += damage;
        damage
    }

    fn take_damage(&mut self, damage: f64) {
        self.strength -= damage;
        if self.strength < MINIMUM_STRENGTH {
            self.strength = 0.0;
        }
    }
}

fn strength_adjusted_efficiency(strength: f64, minimum: f64) -> f64 {
    minimum + strength * (1.0 - minimum)
}

/// Runs fights
#[derive(Debug, Clone)]
pub struct Combat {
    randomised: bool,
    distribution: NormalDistribution,
}

impl Default for Combat {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Combat {
    /// Create a combat resolver; without randomisation every combatant fights
    /// at mean efficiency
    pub fn new(randomised: bool) -> Self {
        Self {
            randomised,
            distribution: NormalDistribution::new(
                COMBAT_EFFICIENCY_MEAN,
                COMBAT_EFFICIENCY_DEVIATION,
            ),
        }
    }

    fn efficiency(&mut self, rng: &mut impl Rng) -> f64 {
        if self.randomised {
            self.distribution.sample(rng)
        } else {
            COMBAT_EFFICIENCY_MEAN
        }
    }

    /// Fight it out
    ///
    /// `anti_air` is only consulted for air attacks
    pub fn resolve(
        &mut self,
        attacker: &Unit,
        defender: &Unit,
        anti_air: &[&Unit],
        rng: &mut impl Rng,
    ) -> CombatOutcome {
        let attack_type = AttackType::of(attacker);
        let defender_stats = if attacker.has_flag(UnitFlag::Engineer) {
            defender.stats_ignoring_entrenchment()
        } else {
            defender.stats.clone()
        };

        let attacker_efficiency = self.efficiency(rng);
        let defender_efficiency = self.efficiency(rng);
        let mut attacker_state = Combatant::new(
            attacker.strength,
            Unit::damage_against(&attacker.stats, defender.unit_type.hardness, true),
            attacker_efficiency,
        );
        let mut defender_state = Combatant::new(
            defender.strength,
            Unit::damage_against(&defender_stats, attacker.unit_type.hardness, false),
            defender_efficiency,
        );

        let rounds = match attack_type {
            AttackType::Ground => ground_attack(&mut attacker_state, &mut defender_state),
            AttackType::Artillery => {
                defender_state = defender_state.with_divisor(defender_stats.bombardment_defence);
                bombard(&mut attacker_state, &mut defender_state, &mut [])
            }
            AttackType::Air => {
                let mut anti_air_states = anti_air
                    .iter()
                    .map(|unit| {
                        let efficiency = self.efficiency(rng);
                        Combatant::new(unit.strength, unit.stats.air_attack as f64, efficiency)
                    })
                    .collect::<Vec<_>>();
                attacker_state = attacker_state.with_divisor(attacker.stats.anti_air_defence);
                defender_state = defender_state.with_divisor(defender_stats.bombardment_defence);
                bombard(
                    &mut attacker_state,
                    &mut defender_state,
                    &mut anti_air_states,
                )
            }
        };

        CombatOutcome {
            attack_type,
            attacker_strength: attacker_state.strength,
            defender_strength: defender_state.strength,
            rounds,
        }
    }
}

fn target_damage_reached(attacker: &Combatant, defender: &Combatant) -> bool {
    let lower = attacker.damage_dealt.min(defender.damage_dealt);
    let higher = attacker.damage_dealt.max(defender.damage_dealt);
    lower > LOWER_TARGET_DAMAGE && higher > HIGHER_TARGET_DAMAGE
}

fn ground_attack(attacker: &mut Combatant, defender: &mut Combatant) -> u32 {
    let mut rounds = 0;
    while attacker.is_alive() && defender.is_alive() && !target_damage_reached(attacker, defender)
    {
        let attacker_damage = attacker.fire();
        let defender_damage = defender.fire();
        attacker.take_damage(defender_damage);
        defender.take_damage(attacker_damage);
        rounds += 1;
        if attacker_damage == 0.0 && defender_damage == 0.0 {
            // neither side can hurt the other
            break;
        }
    }
    rounds
}

fn bombard(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    anti_air: &mut [Combatant],
) -> u32 {
    let mut rounds = 0;
    while rounds < BOMBARDMENT_ATTACKS && attacker.is_alive() && defender.is_alive() {
        let efficiency =
            strength_adjusted_efficiency(defender.strength, BOMBARDMENT_EFFICIENCY_MINIMUM);
        let damage = efficiency * attacker.fire();
        defender.take_damage(damage);
        for unit in anti_air.iter_mut() {
            let efficiency =
                strength_adjusted_efficiency(attacker.strength, ANTI_AIR_EFFICIENCY_MINIMUM);
            let damage = efficiency * unit.fire();
            attacker.take_damage(damage);
        }
        rounds += 1;
    }
    rounds
}

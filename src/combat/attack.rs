//! Attack templates and damage rolls

use crate::core::dice;
use crate::core::types::PartId;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weapon skill family an attack is delivered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Brawling,
    AxeMace,
    AxeMace2h,
    Sword,
    Spear,
    Rifle,
    Pistol,
}

/// Which muscle action powers a melee attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Muscle {
    Thrust,
    Swing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Bash,
    Cut,
    Pierce,
}

/// Data template for a melee attack mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeAttack {
    pub skill: Skill,
    /// Craftsmanship modifier on the roll
    pub quality: i32,
    pub muscle: Muscle,
    pub damage_type: DamageType,
    pub damage_mod: i32,
    /// Minimum strength to use without penalty; negative means none
    #[serde(alias = "ST_requirement")]
    pub st_requirement: i32,
    /// Distances (in cells) the attack can be delivered at
    pub reach: Vec<i32>,
}

impl MeleeAttack {
    /// The bare-handed attack every actor falls back to
    pub fn unarmed() -> Self {
        Self {
            skill: Skill::Brawling,
            quality: 0,
            muscle: Muscle::Thrust,
            damage_type: DamageType::Bash,
            damage_mod: -2,
            st_requirement: -1,
            reach: vec![0, 1],
        }
    }

    pub fn min_reach(&self) -> i32 {
        self.reach.iter().copied().min().unwrap_or(0)
    }

    pub fn max_reach(&self) -> i32 {
        self.reach.iter().copied().max().unwrap_or(0)
    }
}

/// Data template for a ranged attack mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedAttack {
    pub skill: Skill,
    pub damage_type: DamageType,
    /// Number of d6 of damage per shot
    pub power_dice: u32,
    pub power_mod: i32,
    /// Aiming bonus cap
    pub accuracy: i32,
    /// Handling penalty when firing at point blank
    pub bulk: i32,
    /// Shots per attack
    pub rof: u32,
    /// Skill margin needed per extra shot landed
    pub recoil: i32,
    pub max_range: i32,
}

/// A resolved attack in flight toward a defender
#[derive(Debug, Clone)]
pub struct Attack {
    pub power: i32,
    pub damage_type: DamageType,
    /// Explicit part to strike; `None` lets anatomy weighting decide
    pub target_part: Option<PartId>,
}

/// Strength-derived damage roll for a melee attack.
///
/// Swings gain leverage: effective strength is raised by max(2, ST-7).
/// Dice and modifier follow from effective strength, with the template's
/// own damage modifier applied on top.
pub fn melee_power(st: i32, attack: &MeleeAttack, rng: &mut impl Rng) -> i32 {
    let effective_st = match attack.muscle {
        Muscle::Swing => st + (st - 7).max(2),
        Muscle::Thrust => st,
    };
    let dice_count = ((effective_st - 3).div_euclid(8)).max(1) as u32;
    let st_mod = if effective_st >= 11 {
        (effective_st - 3).rem_euclid(8) / 2 - 1
    } else {
        (effective_st + 1).div_euclid(2) - 7
    };
    dice::roll(dice_count, st_mod + attack.damage_mod, rng)
}

/// Damage roll for one ranged shot
pub fn ranged_power(attack: &RangedAttack, rng: &mut impl Rng) -> i32 {
    dice::roll(attack.power_dice, attack.power_mod, rng)
}

//! Simulation configuration with documented constants
//!
//! The tunable numbers of the combat and decision systems are collected
//! here rather than scattered through the resolution code. All fields have
//! serde defaults so a partial `config.toml` only overrides what it names.

use serde::Deserialize;

/// Tunables for the simulation core
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Multiple of the per-part damage threshold beyond which a part is
    /// destroyed outright instead of crippled.
    pub destroy_threshold_ratio: i32,

    /// Maximum consecutive toughness checks once hit points cross zero.
    /// Exhausting them is death.
    pub death_check_cap: u32,

    /// Flat bonus on top of speed when computing the dodge target number.
    pub dodge_bonus: i32,

    /// Visibility values below this end a ray.
    pub visibility_epsilon: f32,

    /// An INVESTIGATE goal is satisfied once visibility to its target
    /// exceeds this.
    pub investigate_visibility: f32,

    /// Chance in ten that an idle actor wanders instead of standing still.
    pub wander_chance: u32,

    /// Upper bound on goal expansions per turn. A stack that cannot
    /// produce an action within this many steps falls back to waiting.
    pub max_goal_expansions: u32,

    /// Delay assigned by waiting, attacking, and most deliberate acts.
    pub base_action_delay: i32,

    /// Delay assigned to corpses and unconscious actors per round.
    pub downed_delay: i32,

    /// Cut damage multiplier against parts that can be cut through.
    pub cut_multiplier: f32,

    /// Pierce damage multiplier per degree of injury tolerance.
    pub pierce_tolerance_multiplier: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            destroy_threshold_ratio: 2,
            death_check_cap: 5,
            dodge_bonus: 3,
            visibility_epsilon: 0.1,
            investigate_visibility: 0.5,
            wander_chance: 2,
            max_goal_expansions: 16,
            base_action_delay: 10,
            downed_delay: 100,
            cut_multiplier: 1.5,
            pierce_tolerance_multiplier: 0.5,
        }
    }
}

impl SimConfig {
    /// Parse a TOML override file. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> crate::core::error::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.destroy_threshold_ratio, 2);
        assert_eq!(config.death_check_cap, 5);
    }

    #[test]
    fn test_partial_toml_override() {
        let config = SimConfig::from_toml("death_check_cap = 3\n").unwrap();
        assert_eq!(config.death_check_cap, 3);
        assert_eq!(config.destroy_threshold_ratio, 2);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = SimConfig::from_toml("").unwrap();
        assert_eq!(config.base_action_delay, SimConfig::default().base_action_delay);
    }
}

//! Session and application configuration.
//!
//! [`DefenseConfig`] is fixed for the lifetime of a combat session.
//! [`AppConfig`] is the user-editable file at `~/.fitquest/config.json`;
//! missing fields fall back to defaults so older files keep loading.

use serde::{Deserialize, Serialize};

use crate::core::constants::*;
use crate::defense_mode::types::Difficulty;
use crate::utils::persistence::{load_json_or_default, save_json};

pub const CONFIG_FILE: &str = "config.json";

/// Timing and balance values for the monster attack / defense rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// Continuous correct form required before the shield goes up.
    pub required_defense_ms: u64,
    pub attack_interval_ms: u64,
    /// Grace period after the session starts before the first warning.
    pub initial_delay_ms: u64,
    pub attack_warning_ms: u64,
    pub attack_damage: u32,
    /// Shield points per second restored while an unlimited shield is up.
    pub shield_regen_rate: f64,
    pub max_hp: u32,
    pub max_shield: u32,
    pub invulnerability_ms: u64,
    pub attack_lockout_ms: u64,
    pub resume_resync_ms: u64,
    pub pulse_shield_ms: u64,
    pub quality_threshold: f64,
    /// Monster damage per new repetition.
    pub rep_damage: u32,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            required_defense_ms: REQUIRED_DEFENSE_MS,
            attack_interval_ms: ATTACK_INTERVAL_MS,
            initial_delay_ms: ATTACK_INITIAL_DELAY_MS,
            attack_warning_ms: ATTACK_WARNING_MS,
            attack_damage: MONSTER_ATTACK_DAMAGE,
            shield_regen_rate: SHIELD_REGEN_PER_SECOND,
            max_hp: PLAYER_MAX_HP,
            max_shield: PLAYER_MAX_SHIELD,
            invulnerability_ms: INVULNERABILITY_MS,
            attack_lockout_ms: ATTACK_LOCKOUT_MS,
            resume_resync_ms: RESUME_RESYNC_MS,
            pulse_shield_ms: PULSE_SHIELD_MS,
            quality_threshold: QUALITY_THRESHOLD,
            rep_damage: REP_DAMAGE,
        }
    }
}

/// Persistent front-end settings. CLI flags override individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub combat: DefenseConfig,
    /// WebSocket URL of the pose-detection backend.
    pub backend_url: String,
    /// Base URL of the continuous-defense session authority. `None` runs
    /// the mode on local state only.
    pub authority_url: Option<String>,
    pub camera_index: u32,
    pub detection_line: f64,
    pub default_exercise: String,
    pub difficulty: Difficulty,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            combat: DefenseConfig::default(),
            backend_url: "ws://127.0.0.1:5000/exercise".to_string(),
            authority_url: None,
            camera_index: 0,
            detection_line: DEFAULT_DETECTION_LINE,
            default_exercise: "squat".to_string(),
            difficulty: Difficulty::Normal,
        }
    }
}

impl AppConfig {
    /// Load `~/.fitquest/config.json`, falling back to defaults.
    pub fn load() -> Self {
        load_json_or_default(CONFIG_FILE)
    }

    pub fn save(&self) -> std::io::Result<()> {
        save_json(CONFIG_FILE, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_balance_constants() {
        let config = DefenseConfig::default();
        assert_eq!(config.max_hp, 150);
        assert_eq!(config.max_shield, 50);
        assert_eq!(config.attack_interval_ms, 25_000);
        assert_eq!(config.initial_delay_ms, 30_000);
        assert_eq!(config.attack_warning_ms, 8_000);
        assert_eq!(config.quality_threshold, 4.0);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"combat": {"attack_damage": 25}, "camera_index": 2}"#;
        let config: AppConfig = serde_json::from_str(json).expect("valid config");
        assert_eq!(config.combat.attack_damage, 25);
        assert_eq!(config.combat.max_hp, PLAYER_MAX_HP);
        assert_eq!(config.camera_index, 2);
        assert_eq!(config.difficulty, Difficulty::Normal);
        assert!(config.authority_url.is_none());
    }
}

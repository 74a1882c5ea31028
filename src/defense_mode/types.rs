use serde::{Deserialize, Serialize};
use std::fmt;

use crate::combat::types::ExerciseKind;
use crate::core::constants::VALID_MOTION_STALENESS_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Nightmare,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Nightmare,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
            Self::Nightmare => "nightmare",
        }
    }

    /// Balance table for this difficulty.
    pub fn config(&self) -> ModeConfig {
        let (target_secs, interval_ms, damage, repair_rate, repair_interval_ms) = match self {
            Self::Easy => (45, 3_000, 10, 15, 2_500),
            Self::Normal => (60, 2_000, 15, 10, 3_000),
            Self::Hard => (90, 1_500, 20, 8, 3_500),
            Self::Nightmare => (120, 1_000, 25, 5, 4_000),
        };
        ModeConfig {
            target_duration_ms: target_secs * 1000,
            monster_attack_interval_ms: interval_ms,
            monster_damage: damage,
            shield_repair_rate: repair_rate,
            shield_repair_interval_ms: repair_interval_ms,
            ..ModeConfig::default()
        }
    }

    pub fn score_multiplier(&self) -> f64 {
        match self {
            Self::Easy => 0.8,
            Self::Normal => 1.0,
            Self::Hard => 1.3,
            Self::Nightmare => 1.6,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Easy => Self::Normal,
            Self::Normal => Self::Hard,
            Self::Hard => Self::Nightmare,
            Self::Nightmare => Self::Easy,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rules for one continuous defense run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub target_duration_ms: u64,
    pub monster_attack_interval_ms: u64,
    pub monster_damage: u32,
    /// Repair points at quality 10 before the multiplier.
    pub shield_repair_rate: u32,
    /// Minimum gap between two repairs.
    pub shield_repair_interval_ms: u64,
    pub max_hp: u32,
    pub max_shield: u32,
    pub quality_threshold: f64,
    pub repair_quality_multiplier: f64,
    /// A valid sample older than this stops time from accruing.
    pub staleness_ms: u64,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            target_duration_ms: 60_000,
            monster_attack_interval_ms: 2_000,
            monster_damage: 15,
            shield_repair_rate: 10,
            shield_repair_interval_ms: 3_000,
            max_hp: 100,
            max_shield: 100,
            quality_threshold: 3.0,
            repair_quality_multiplier: 1.0,
            staleness_ms: VALID_MOTION_STALENESS_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeStatus {
    NotStarted,
    Active,
    Completed,
    GameOver,
}

impl ModeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::GameOver)
    }
}

/// Running totals; also the shape the authority reports under `statistics`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeStatistics {
    pub total_damage_taken: u32,
    pub total_shield_repaired: u32,
    pub total_attacks_survived: u32,
    pub max_combo: u32,
    pub current_combo: u32,
    /// Valid motion samples received.
    pub exercise_sessions: u32,
}

/// One detection result fed into the mode. Serialized as the authority's
/// `exercise_data` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    #[serde(rename = "type")]
    pub exercise: ExerciseKind,
    pub quality: f64,
    pub is_correct: bool,
}

impl MotionSample {
    pub fn new(exercise: ExerciseKind, quality: f64, is_correct: bool) -> Self {
        Self {
            exercise,
            quality,
            is_correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModeEvent {
    Started { difficulty: Difficulty, target_ms: u64 },
    ShieldRepaired { amount: u32, combo: u32 },
    MonsterAttack {
        attack_number: u32,
        shield_damage: u32,
        hp_damage: u32,
    },
    MonsterMoved { x: f64, y: f64 },
    Completed { score: u32 },
    GameOver { score: u32 },
    Stopped { elapsed_valid_ms: u64 },
    /// The session server failed; play continues on local state.
    AuthorityDegraded { message: String },
    AuthorityRestored,
}

impl ModeEvent {
    pub fn message(&self) -> String {
        match self {
            Self::Started {
                difficulty,
                target_ms,
            } => format!(
                "Continuous defense ({}) started: survive {}s of arm swings",
                difficulty,
                target_ms / 1000
            ),
            Self::ShieldRepaired { amount, combo } => {
                if *combo > 1 {
                    format!("Shield +{} (combo x{})", amount, combo)
                } else {
                    format!("Shield +{}", amount)
                }
            }
            Self::MonsterAttack {
                attack_number,
                shield_damage,
                hp_damage,
            } => format!(
                "Attack #{}: shield -{}, hp -{}",
                attack_number, shield_damage, hp_damage
            ),
            Self::MonsterMoved { .. } => "The monster repositions".to_string(),
            Self::Completed { score } => format!("Victory! Final score {}", score),
            Self::GameOver { score } => format!("Defeated. Final score {}", score),
            Self::Stopped { elapsed_valid_ms } => format!(
                "Continuous defense stopped after {:.1}s",
                *elapsed_valid_ms as f64 / 1000.0
            ),
            Self::AuthorityDegraded { message } => {
                format!("Session server unavailable, playing offline ({})", message)
            }
            Self::AuthorityRestored => "Session server reachable again".to_string(),
        }
    }
}

// Authority wire format. Unknown fields are ignored.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemotePlayerState {
    pub hp: u32,
    pub max_hp: u32,
    pub shield: u32,
    pub max_shield: u32,
    pub is_exercising: bool,
    pub exercise_quality: f64,
    pub exercise_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteMonsterState {
    pub attack_count: u32,
    pub is_attacking: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteGameState {
    pub is_active: bool,
    /// Seconds of wall time since the remote game started.
    pub elapsed_time: f64,
    /// Seconds.
    pub target_time: f64,
    pub is_completed: bool,
    pub is_game_over: bool,
    pub difficulty_level: Option<Difficulty>,
    pub score: u32,
}

/// Session state as reported by the authority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub player_state: RemotePlayerState,
    pub monster_state: RemoteMonsterState,
    pub game_state: RemoteGameState,
    pub statistics: ModeStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_tables() {
        let easy = Difficulty::Easy.config();
        assert_eq!(easy.target_duration_ms, 45_000);
        assert_eq!(easy.monster_attack_interval_ms, 3_000);
        let nightmare = Difficulty::Nightmare.config();
        assert_eq!(nightmare.monster_damage, 25);
        assert_eq!(nightmare.shield_repair_interval_ms, 4_000);
        assert_eq!(nightmare.max_shield, 100);
    }

    #[test]
    fn test_difficulty_serde_is_lowercase() {
        let json = serde_json::to_string(&Difficulty::Nightmare).expect("serialize");
        assert_eq!(json, "\"nightmare\"");
        assert_eq!(Difficulty::Nightmare.next(), Difficulty::Easy);
    }

    #[test]
    fn test_motion_sample_wire_shape() {
        let sample = MotionSample::new(ExerciseKind::AlternatingArmSwing, 4.0, true);
        let json = serde_json::to_value(&sample).expect("serialize");
        assert_eq!(json["type"], "alternating-arm-swing");
        assert_eq!(json["is_correct"], true);
    }

    #[test]
    fn test_snapshot_parses_partial_server_payload() {
        let json = r#"{
            "session_id": "abc",
            "user_id": "u1",
            "player_state": {"hp": 70, "max_hp": 100, "shield": 20, "max_shield": 100},
            "game_state": {"is_active": true, "elapsed_time": 12.5, "difficulty_level": "hard"},
            "statistics": {"max_combo": 3},
            "recent_events": []
        }"#;
        let snap: SessionSnapshot = serde_json::from_str(json).expect("parse");
        assert_eq!(snap.player_state.hp, 70);
        assert_eq!(snap.game_state.difficulty_level, Some(Difficulty::Hard));
        assert_eq!(snap.statistics.max_combo, 3);
        assert_eq!(snap.monster_state.attack_count, 0);
    }
}

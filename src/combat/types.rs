use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::config::DefenseConfig;

/// Exercise reported by the pose backend.
///
/// Labels arrive in two spellings (kebab-case ids and display names); both
/// map to the same kind. Unknown labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExerciseKind {
    Squat,
    BicepCurl,
    ShoulderPress,
    PushUp,
    PullUp,
    DumbbellRow,
    Plank,
    TableTennis,
    Basketball,
    BasketballDribble,
    VolleyballOverhand,
    VolleyballLowhand,
    AlternatingArmSwing,
    Other(String),
}

impl ExerciseKind {
    /// Exercises the front-end offers for selection, in cycle order.
    pub const SELECTABLE: [ExerciseKind; 7] = [
        ExerciseKind::Squat,
        ExerciseKind::BicepCurl,
        ExerciseKind::ShoulderPress,
        ExerciseKind::PushUp,
        ExerciseKind::PullUp,
        ExerciseKind::DumbbellRow,
        ExerciseKind::AlternatingArmSwing,
    ];

    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        match normalized.as_str() {
            "squat" => Self::Squat,
            "bicep-curl" => Self::BicepCurl,
            "shoulder-press" => Self::ShoulderPress,
            "push-up" | "pushup" => Self::PushUp,
            "pull-up" | "pullup" => Self::PullUp,
            "dumbbell-row" => Self::DumbbellRow,
            "plank" => Self::Plank,
            "table-tennis" => Self::TableTennis,
            "basketball" => Self::Basketball,
            "basketball-dribble" => Self::BasketballDribble,
            "volleyball-overhand" => Self::VolleyballOverhand,
            "volleyball-lowhand" => Self::VolleyballLowhand,
            "alternating-arm-swing" | "alternating-arm-swing-warmup" => Self::AlternatingArmSwing,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    /// Wire label sent back to the backend in `start_detection`.
    pub fn label(&self) -> &str {
        match self {
            Self::Squat => "squat",
            Self::BicepCurl => "bicep-curl",
            Self::ShoulderPress => "shoulder-press",
            Self::PushUp => "push-up",
            Self::PullUp => "pull-up",
            Self::DumbbellRow => "dumbbell-row",
            Self::Plank => "plank",
            Self::TableTennis => "table-tennis",
            Self::Basketball => "basketball",
            Self::BasketballDribble => "basketball-dribble",
            Self::VolleyballOverhand => "volleyball-overhand",
            Self::VolleyballLowhand => "volleyball-lowhand",
            Self::AlternatingArmSwing => "alternating-arm-swing",
            Self::Other(label) => label,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Squat => "Squat",
            Self::BicepCurl => "Bicep Curl",
            Self::ShoulderPress => "Shoulder Press",
            Self::PushUp => "Push-up",
            Self::PullUp => "Pull-up",
            Self::DumbbellRow => "Dumbbell Row",
            Self::Plank => "Plank",
            Self::TableTennis => "Table Tennis",
            Self::Basketball => "Basketball",
            Self::BasketballDribble => "Basketball Dribble",
            Self::VolleyballOverhand => "Volleyball Overhand",
            Self::VolleyballLowhand => "Volleyball Lowhand",
            Self::AlternatingArmSwing => "Alternating Arm Swing",
            Self::Other(label) => label,
        }
    }

    /// How a raised shield behaves when an attack lands.
    pub fn defense_policy(&self) -> DefensePolicy {
        match self {
            Self::AlternatingArmSwing => DefensePolicy::Consumable,
            _ => DefensePolicy::Unlimited,
        }
    }

    /// Next entry in [`Self::SELECTABLE`], wrapping around.
    pub fn next_selectable(&self) -> Self {
        let index = Self::SELECTABLE
            .iter()
            .position(|kind| kind == self)
            .map_or(0, |i| (i + 1) % Self::SELECTABLE.len());
        Self::SELECTABLE[index].clone()
    }
}

impl From<String> for ExerciseKind {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<ExerciseKind> for String {
    fn from(kind: ExerciseKind) -> Self {
        kind.label().to_string()
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Shield consumption rule, chosen per exercise at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefensePolicy {
    /// A raised shield blocks every attack without being depleted.
    Unlimited,
    /// The shield soaks damage point for point and drops when empty.
    Consumable,
}

/// Player pools and defense status for one combat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCombatState {
    pub hp: u32,
    pub max_hp: u32,
    pub shield: u32,
    pub max_shield: u32,
    pub is_defending: bool,
    /// Start of the current run of qualifying samples, `None` when broken.
    pub defense_started_at: Option<u64>,
    /// Last resolution that applied damage to shield or hp.
    pub last_hit_at: Option<u64>,
}

impl PlayerCombatState {
    pub fn new(max_hp: u32, max_shield: u32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            shield: 0,
            max_shield,
            is_defending: false,
            defense_started_at: None,
            last_hit_at: None,
        }
    }

    pub fn from_config(config: &DefenseConfig) -> Self {
        Self::new(config.max_hp, config.max_shield)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn raise_shield(&mut self) {
        self.is_defending = true;
        self.shield = self.max_shield;
    }

    pub fn drop_shield(&mut self) {
        self.is_defending = false;
        self.shield = 0;
    }

    pub fn hp_ratio(&self) -> f64 {
        ratio(self.hp, self.max_hp)
    }

    pub fn shield_ratio(&self) -> f64 {
        ratio(self.shield, self.max_shield)
    }
}

fn ratio(current: u32, max: u32) -> f64 {
    if max == 0 {
        0.0
    } else {
        (current as f64 / max as f64).clamp(0.0, 1.0)
    }
}

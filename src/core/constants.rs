// Tick and timing
pub const TICK_INTERVAL_MS: u64 = 100;
pub const INPUT_POLL_MS: u64 = 50;

// Monster attack scheduler defaults
pub const ATTACK_INTERVAL_MS: u64 = 25_000;
pub const ATTACK_INITIAL_DELAY_MS: u64 = 30_000;
pub const ATTACK_WARNING_MS: u64 = 8_000;
pub const ATTACK_LOCKOUT_MS: u64 = 1_000;
pub const RESUME_RESYNC_MS: u64 = 3_000;
pub const MONSTER_ATTACK_DAMAGE: u32 = 20;

// Player defaults
pub const PLAYER_MAX_HP: u32 = 150;
pub const PLAYER_MAX_SHIELD: u32 = 50;
pub const INVULNERABILITY_MS: u64 = 1_000;
pub const SHIELD_REGEN_PER_SECOND: f64 = 5.0;

// Defense gate
pub const QUALITY_THRESHOLD: f64 = 4.0;
pub const QUALITY_SCORE_MAX: f64 = 5.0;
pub const REQUIRED_DEFENSE_MS: u64 = 1_000;
pub const PULSE_SHIELD_MS: u64 = 2_000;

// Monster roster
pub const REP_DAMAGE: u32 = 10;
pub const LEVEL_HP_STEP: u32 = 50;
pub const MAX_LEVEL: u32 = 5;
// (name, base_hp), cycled to fill a level
pub const MONSTER_ROSTER: [(&str, u32); 3] = [("Slime", 100), ("Goblin", 150), ("Orc", 200)];
// Starting shield per level; index 0 = level 1
pub const LEVEL_START_SHIELD: [u32; 5] = [0, 20, 40, 60, 80];

// Continuous defense mode
pub const VALID_MOTION_STALENESS_MS: u64 = 2_000;
pub const MONSTER_WANDER_INTERVAL_MS: u64 = 3_000;
pub const AUTHORITY_RESYNC_INTERVAL_MS: u64 = 5_000;
pub const SCORE_BASE: f64 = 1000.0;
pub const SCORE_HP_WEIGHT: f64 = 500.0;
pub const SCORE_SHIELD_WEIGHT: f64 = 300.0;
pub const SCORE_PER_COMBO: u32 = 50;
pub const SCORE_PER_ATTACK_SURVIVED: u32 = 25;
pub const SCORE_PER_VALID_SAMPLE: u32 = 10;

// Wire boundary
pub const MIN_VIDEO_FRAME_LEN: usize = 100;
pub const DEFAULT_DETECTION_LINE: f64 = 0.5;

// On-screen event log
pub const EVENT_LOG_CAPACITY: usize = 50;

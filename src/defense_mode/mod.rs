//! Continuous defense mode: a timed survival ruleset for the alternating
//! arm swing, separate from the regular monster attack cycle.

pub mod authority;
pub mod controller;
pub mod logic;
pub mod types;

pub use controller::ModeController;
pub use logic::ContinuousDefenseSession;
pub use types::*;

//! Monster attacks, player defense and their resolution.

pub mod defense;
pub mod monster;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod types;

pub use resolver::{resolve_attack, AttackOutcome, AttackResolution};
pub use session::{CombatEvent, CombatSession, CombatSnapshot};
pub use types::*;

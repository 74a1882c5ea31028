//! Clock, configuration, balance constants and the top-level game.

pub mod clock;
pub mod config;
pub mod constants;
pub mod game;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, DefenseConfig};
pub use game::{Game, LogEntry, LogLevel, Screen};

//! Persistence, logging setup and recorded-session playback.

pub mod logging;
pub mod persistence;
pub mod replay;

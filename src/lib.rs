//! FitQuest - pose-tracked monster battle library
//!
//! Exposes the combat rules, continuous defense mode and backend protocol
//! for testing and for the terminal front-end.

pub mod combat;
pub mod core;
pub mod defense_mode;
pub mod protocol;
pub mod utils;
pub mod web;

// Terminal rendering; only the binary draws.
pub mod ui;

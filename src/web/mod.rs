//! Live WebSocket link to the pose-detection backend.
//!
//! The game loop is synchronous; the link runs its own tokio runtime on a
//! background thread and exchanges frames with the loop over channels.
//!
//! ## Usage
//!
//! Build with web feature:
//! ```sh
//! cargo build --features web
//! ```
//!
//! Connect to a running backend:
//! ```sh
//! ./target/debug/fitquest --connect ws://127.0.0.1:5000/exercise
//! ```
//!
//! Without the feature, `--replay <file>` plays a recorded session instead.

#[cfg(feature = "web")]
mod link;

#[cfg(feature = "web")]
pub use link::PoseLink;

//! Logger setup. The terminal belongs to the UI, so records go to
//! `~/.fitquest/fitquest.log` instead of stderr.

use env_logger::{Env, Target};
use std::io;

use crate::utils::persistence::open_log_file;

/// Initialise the global logger. `RUST_LOG` controls the filter, default `info`.
pub fn init_file_logger() -> io::Result<()> {
    let file = open_log_file()?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

//! JSON persistence helpers for files under `~/.fitquest/`.
//!
//! `FITQUEST_HOME` overrides the directory (used by scripted runs that must
//! not touch the real home directory).

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "FITQUEST_HOME";
pub const LOG_FILE: &str = "fitquest.log";

/// Get the data directory path, creating it if needed.
pub fn data_dir() -> io::Result<PathBuf> {
    let dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(custom) => PathBuf::from(custom),
        None => {
            let home_dir = dirs::home_dir().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "Could not determine home directory",
                )
            })?;
            home_dir.join(".fitquest")
        }
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the full path for a file in the data directory.
pub fn data_path(filename: &str) -> io::Result<PathBuf> {
    Ok(data_dir()?.join(filename))
}

/// Load a JSON file from the data directory, returning `T::default()` if it
/// is missing. An unreadable or malformed file is logged and also yields the
/// default.
pub fn load_json_or_default<T: Default + serde::de::DeserializeOwned>(filename: &str) -> T {
    let path = match data_path(filename) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("No data directory for {}: {}", filename, e);
            return T::default();
        }
    };
    match fs::read_to_string(&path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed {}: {}", path.display(), e);
            T::default()
        }),
        Err(_) => T::default(),
    }
}

/// Save a value as pretty-printed JSON to the data directory.
pub fn save_json<T: serde::Serialize>(filename: &str, data: &T) -> io::Result<()> {
    let path = data_path(filename)?;
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, json)?;
    Ok(())
}

/// Open the log file in append mode.
pub fn open_log_file() -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_path(LOG_FILE)?)
}

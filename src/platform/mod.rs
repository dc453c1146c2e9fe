// passforge platform abstraction
// Provides platform-specific paths for Windows, macOS, and Linux.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as imp;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use macos as imp;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use windows as imp;

/// Environment variable that relocates the data directory.
pub const DATA_DIR_ENV: &str = "PASSFORGE_DATA_DIR";

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `~/.config/passforge` (or `$XDG_CONFIG_HOME/passforge`)
/// - **macOS**: `~/Library/Application Support/passforge`
/// - **Windows**: `%APPDATA%/passforge`
pub fn get_config_dir() -> PathBuf {
    imp::get_config_dir()
}

/// Returns the data directory, honoring `PASSFORGE_DATA_DIR` first.
pub fn get_data_dir() -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => imp::get_data_dir(),
    }
}

/// Default SQLite database location.
pub fn default_database_path() -> PathBuf {
    get_data_dir().join("passforge.db")
}

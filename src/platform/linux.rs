// passforge platform paths for Linux
// Config: ~/.config/passforge
// Data:   ~/.local/share/passforge

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the configuration directory for passforge on Linux.
/// Uses `$XDG_CONFIG_HOME/passforge` if set, otherwise `~/.config/passforge`.
pub fn get_config_dir() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("passforge"),
        _ => home_dir().join(".config").join("passforge"),
    }
}

/// Returns the data directory for passforge on Linux.
/// Uses `$XDG_DATA_HOME/passforge` if set, otherwise `~/.local/share/passforge`.
pub fn get_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("passforge"),
        _ => home_dir().join(".local").join("share").join("passforge"),
    }
}

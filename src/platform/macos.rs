// passforge platform paths for macOS
// Config and data: ~/Library/Application Support/passforge

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// `~/Library/Application Support/passforge`
pub fn get_config_dir() -> PathBuf {
    home_dir()
        .join("Library")
        .join("Application Support")
        .join("passforge")
}

/// Same location as the config directory on macOS.
pub fn get_data_dir() -> PathBuf {
    get_config_dir()
}

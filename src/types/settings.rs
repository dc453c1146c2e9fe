use serde::{Deserialize, Serialize};

use super::password::{PasswordConfig, MAX_LENGTH, MIN_LENGTH};

/// Top-level application settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppSettings {
    pub generator: PasswordConfig,
    pub history: HistorySettings,
    pub storage: StorageSettings,
    pub remote: RemoteSettings,
    pub auth: AuthSettings,
    pub scheduler: SchedulerSettings,
}

impl AppSettings {
    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.generator.length) {
            return Err(format!(
                "generator.length must be within [{}, {}], got {}",
                MIN_LENGTH, MAX_LENGTH, self.generator.length
            ));
        }
        if self.history.capacity == 0 {
            return Err("history.capacity must be at least 1".to_string());
        }
        if self.remote.timeout_secs == 0 {
            return Err("remote.timeout_secs must be at least 1".to_string());
        }
        if let Some(url) = &self.remote.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("remote.url must be an http(s) URL: {}", url));
            }
        }
        Ok(())
    }
}

/// History bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySettings {
    pub capacity: usize,
    /// Maximum records kept in the generation log; 0 disables it.
    pub generation_log_capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: 10,
            generation_log_capacity: 50,
        }
    }
}

/// Lifetime of locally persisted values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Wiped every time the application starts.
    Session,
    /// Kept across restarts.
    Profile,
}

impl StorageScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageScope::Session => "session",
            StorageScope::Profile => "profile",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// Scope used for generator config and history.
    pub scope: StorageScope,
    /// Database file; defaults to `<data dir>/passforge.db`.
    #[serde(default)]
    pub database_path: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            scope: StorageScope::Profile,
            database_path: None,
        }
    }
}

/// Supabase-compatible backend location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub table: String,
    pub timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            table: "passwords".to_string(),
            timeout_secs: 10,
        }
    }
}

impl RemoteSettings {
    /// Both the URL and the anon key are present.
    pub fn is_configured(&self) -> bool {
        matches!((&self.url, &self.anon_key), (Some(u), Some(k)) if !u.is_empty() && !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    /// Minimum spacing between two auth calls.
    pub min_interval_ms: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerSettings {
    pub debounce_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

//! Typed access to the values passforge persists in a [`KeyValueStore`].
//!
//! Every value is stored JSON-encoded under a fixed key. Malformed values
//! never fail a load: they are logged and replaced by the default.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::local_store::KeyValueStore;
use crate::types::auth::Session;
use crate::types::errors::StorageError;
use crate::types::history::{GenerationRecord, HistoryEntry};
use crate::types::password::PasswordConfig;

pub const KEY_PASSWORD_LENGTH: &str = "passwordLength";
pub const KEY_INCLUDE_UPPERCASE: &str = "includeUppercase";
pub const KEY_INCLUDE_NUMBERS: &str = "includeNumbers";
pub const KEY_INCLUDE_SYMBOLS: &str = "includeSymbols";
pub const KEY_INCLUDE_LOWERCASE: &str = "includeLowercase";
pub const KEY_CUSTOM_SYMBOLS: &str = "customSymbols";
pub const KEY_PASSWORD_HISTORY: &str = "passwordHistory";
pub const KEY_CURRENT_PASSWORD: &str = "currentPassword";
pub const KEY_SHOULD_GENERATE: &str = "shouldGeneratePassword";
pub const KEY_GENERATION_LOG: &str = "generationLog";
pub const KEY_AUTH_SESSION: &str = "authSession";

/// History entry as found in older snapshots: any field but the password may be missing.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHistoryEntry {
    #[serde(default)]
    id: Option<String>,
    password: String,
    #[serde(default, alias = "timestamp")]
    created_at: Option<String>,
    #[serde(default)]
    is_favorite: bool,
}

/// Locale renderings older snapshots used for `createdAt`, tried in order.
const LEGACY_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y, %I:%M:%S %p",
    "%d/%m/%Y, %H:%M:%S",
    "%d.%m.%Y, %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses an RFC 3339 stamp or a local-time locale string.
fn parse_legacy_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    LEGACY_TIMESTAMP_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(raw, format).ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

impl StoredHistoryEntry {
    /// `fallback` is used when `createdAt` is missing or unreadable.
    fn into_entry(self, fallback: DateTime<Utc>) -> HistoryEntry {
        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_legacy_timestamp)
            .unwrap_or(fallback);
        HistoryEntry {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            password: self.password,
            created_at,
            is_favorite: self.is_favorite,
        }
    }
}

/// Preferences facade over a key-value store.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring malformed value for {}: {}", key, e);
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    /// Loads the generator config, falling back field by field to `defaults`.
    pub fn load_config(&self, defaults: &PasswordConfig) -> PasswordConfig {
        let mut config = defaults.clone();
        if let Some(length) = self.read::<usize>(KEY_PASSWORD_LENGTH) {
            config.set_length(length);
        }
        if let Some(v) = self.read(KEY_INCLUDE_LOWERCASE) {
            config.include_lowercase = v;
        }
        if let Some(v) = self.read(KEY_INCLUDE_UPPERCASE) {
            config.include_uppercase = v;
        }
        if let Some(v) = self.read(KEY_INCLUDE_NUMBERS) {
            config.include_numbers = v;
        }
        if let Some(v) = self.read(KEY_INCLUDE_SYMBOLS) {
            config.include_symbols = v;
        }
        if let Some(symbols) = self.read::<Vec<String>>(KEY_CUSTOM_SYMBOLS) {
            // Stored as single-character strings; anything longer is dropped.
            config.set_custom_symbols(symbols.iter().filter_map(|s| single_char(s)));
        }
        config
    }

    pub fn save_config(&self, config: &PasswordConfig) -> Result<(), StorageError> {
        self.write(KEY_PASSWORD_LENGTH, &config.length)?;
        self.write(KEY_INCLUDE_LOWERCASE, &config.include_lowercase)?;
        self.write(KEY_INCLUDE_UPPERCASE, &config.include_uppercase)?;
        self.write(KEY_INCLUDE_NUMBERS, &config.include_numbers)?;
        self.write(KEY_INCLUDE_SYMBOLS, &config.include_symbols)?;
        let symbols: Vec<String> = config.custom_symbols.iter().map(|c| c.to_string()).collect();
        self.write(KEY_CUSTOM_SYMBOLS, &symbols)
    }

    /// Loads the history snapshot, repairing entries written by older versions.
    ///
    /// Entries without a readable timestamp get strictly decreasing stamps
    /// below load time, so the stored newest-first order survives a re-sort.
    pub fn load_history(&self) -> Vec<HistoryEntry> {
        let now = Utc::now();
        self.read::<Vec<StoredHistoryEntry>>(KEY_PASSWORD_HISTORY)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, stored)| stored.into_entry(now - Duration::milliseconds(index as i64)))
            .collect()
    }

    pub fn save_history(&self, entries: &[HistoryEntry]) -> Result<(), StorageError> {
        self.write(KEY_PASSWORD_HISTORY, entries)
    }

    pub fn load_generation_log(&self) -> Vec<GenerationRecord> {
        self.read(KEY_GENERATION_LOG).unwrap_or_default()
    }

    pub fn save_generation_log(&self, records: &[GenerationRecord]) -> Result<(), StorageError> {
        self.write(KEY_GENERATION_LOG, records)
    }

    pub fn current_password(&self) -> Option<String> {
        self.read(KEY_CURRENT_PASSWORD)
    }

    pub fn set_current_password(&self, password: &str) -> Result<(), StorageError> {
        self.write(KEY_CURRENT_PASSWORD, password)
    }

    /// Whether a fresh password should be generated when the generator view opens.
    pub fn should_generate_password(&self) -> bool {
        self.read(KEY_SHOULD_GENERATE).unwrap_or(true)
    }

    pub fn set_should_generate_password(&self, value: bool) -> Result<(), StorageError> {
        self.write(KEY_SHOULD_GENERATE, &value)
    }

    pub fn load_session(&self) -> Option<Session> {
        self.read(KEY_AUTH_SESSION)
    }

    pub fn save_session(&self, session: Option<&Session>) -> Result<(), StorageError> {
        match session {
            Some(s) => self.write(KEY_AUTH_SESSION, s),
            None => self.store.remove(KEY_AUTH_SESSION),
        }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

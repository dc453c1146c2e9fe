// passforge Settings Engine
// Manages application settings: loading, saving, updating individual values, and resetting to defaults.
// Settings are stored as a JSON file at the platform-specific config path.

use std::fs;
use std::path::Path;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::AppSettings;

pub const SUPABASE_URL_ENV: &str = "PASSFORGE_SUPABASE_URL";
pub const SUPABASE_ANON_KEY_ENV: &str = "PASSFORGE_SUPABASE_ANON_KEY";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppSettings;
    fn get_value(&self, key: &str) -> Result<serde_json::Value, SettingsError>;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: AppSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            settings: AppSettings::default(),
        }
    }

    /// Applies the backend location from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Applies overrides through `lookup`. Empty values are ignored.
    /// Overrides are applied in memory; a later `save` writes them out.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(SUPABASE_URL_ENV) {
            log::debug!("remote url taken from {}", SUPABASE_URL_ENV);
            self.settings.remote.url = Some(url);
        }
        if let Some(key) = non_empty(SUPABASE_ANON_KEY_ENV) {
            log::debug!("remote anon key taken from {}", SUPABASE_ANON_KEY_ENV);
            self.settings.remote.anon_key = Some(key);
        }
    }

    /// Consumes the engine, returning the in-memory settings.
    pub fn into_settings(self) -> AppSettings {
        self.settings
    }
}

/// `"a.b"` becomes the JSON pointer `"/a/b"`.
fn key_pointer(key: &str) -> Result<String, SettingsError> {
    if key.is_empty() {
        return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
    }
    Ok(format!("/{}", key.replace('.', "/")))
}

fn unknown_key(key: &str) -> SettingsError {
    SettingsError::InvalidKey(format!("Key '{}' not found in settings", key))
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings.
    /// If the file is malformed or fails validation, returns an error.
    fn load(&mut self) -> Result<AppSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            log::debug!("no settings file at {}, using defaults", self.config_path);
            self.settings = AppSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: AppSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        settings.validate().map_err(SettingsError::InvalidValue)?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Reads one setting by dot-notation key path.
    fn get_value(&self, key: &str) -> Result<serde_json::Value, SettingsError> {
        let pointer = key_pointer(key)?;
        let tree = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        tree.pointer(&pointer).cloned().ok_or_else(|| unknown_key(key))
    }

    /// Updates an individual setting by dot-notation key path.
    ///
    /// The key is resolved as a JSON pointer into the serialized settings;
    /// the result is deserialized and validated before it replaces the
    /// current settings. Saves to disk after a successful update.
    ///
    /// # Examples
    /// - `"generator.length"` → updates `settings.generator.length`
    /// - `"history.capacity"` → updates `settings.history.capacity`
    /// - `"storage.scope"` → updates `settings.storage.scope`
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        let pointer = key_pointer(key)?;
        let mut tree = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        let slot = tree.pointer_mut(&pointer).ok_or_else(|| unknown_key(key))?;
        *slot = value;

        let new_settings: AppSettings = serde_json::from_value(tree).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        new_settings
            .validate()
            .map_err(|e| SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e)))?;

        self.settings = new_settings;
        self.save()?;
        log::info!("setting {} updated", key);
        Ok(())
    }

    /// Resets all settings to factory defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = AppSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}

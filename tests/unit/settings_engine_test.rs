//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, value persistence, validation and reset behavior.

use passforge::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use passforge::types::errors::SettingsError;
use passforge::types::settings::{AppSettings, StorageScope};
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("settings.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

/// Without a config file the engine starts from the built-in defaults.
#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, AppSettings::default());
    assert_eq!(settings.history.capacity, 10);
    assert_eq!(settings.history.generation_log_capacity, 50);
    assert_eq!(settings.storage.scope, StorageScope::Profile);
    assert_eq!(settings.auth.min_interval_ms, 2000);
    assert_eq!(settings.scheduler.debounce_ms, 200);
    assert_eq!(settings.remote.table, "passwords");
    assert!(!settings.remote.is_configured());
}

/// A change made through `set_value` is visible to a fresh engine on the same file.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine.set_value("history.capacity", serde_json::json!(25)).unwrap();
        engine.set_value("generator.include_symbols", serde_json::json!(true)).unwrap();
    }

    let mut engine2 = engine_in_temp(&dir);
    let loaded = engine2.load().unwrap();
    assert_eq!(loaded.history.capacity, 25);
    assert!(loaded.generator.include_symbols);
}

#[test]
fn test_set_optional_value() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    engine
        .set_value("remote.url", serde_json::json!("https://demo.supabase.co"))
        .unwrap();
    assert_eq!(engine.get_settings().remote.url.as_deref(), Some("https://demo.supabase.co"));
}

#[test]
fn test_set_value_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    assert!(matches!(
        engine.set_value("history.nonexistent", serde_json::json!(1)),
        Err(SettingsError::InvalidKey(_))
    ));
    assert!(matches!(
        engine.set_value("", serde_json::json!(1)),
        Err(SettingsError::InvalidKey(_))
    ));
}

#[test]
fn test_set_value_rejects_wrong_type() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let result = engine.set_value("history.capacity", serde_json::json!("lots"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    assert_eq!(engine.get_settings().history.capacity, 10, "failed update must not apply");
}

#[test]
fn test_set_value_runs_validation() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    assert!(engine.set_value("generator.length", serde_json::json!(64)).is_err());
    assert!(engine.set_value("history.capacity", serde_json::json!(0)).is_err());
    assert!(engine.set_value("remote.url", serde_json::json!("ftp://nope")).is_err());
    assert_eq!(*engine.get_settings(), AppSettings::default());
}

#[test]
fn test_load_rejects_malformed_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ invalid json }").unwrap();

    let mut engine = engine_in_temp(&dir);
    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_load_rejects_invalid_values() {
    let dir = TempDir::new().unwrap();
    let mut settings = AppSettings::default();
    settings.history.capacity = 0;
    std::fs::write(
        dir.path().join("settings.json"),
        serde_json::to_string(&settings).unwrap(),
    )
    .unwrap();

    let mut engine = engine_in_temp(&dir);
    assert!(matches!(engine.load(), Err(SettingsError::InvalidValue(_))));
}

/// After modifying settings and calling `reset()`, all values revert to
/// defaults and the defaults are persisted to disk.
#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine.set_value("storage.scope", serde_json::json!("session")).unwrap();
        engine.set_value("auth.min_interval_ms", serde_json::json!(5000)).unwrap();

        engine.reset().unwrap();
        assert_eq!(*engine.get_settings(), AppSettings::default());
    }

    let mut engine2 = engine_in_temp(&dir);
    assert_eq!(engine2.load().unwrap(), AppSettings::default());
}

#[test]
fn test_overrides_are_applied_over_file() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    engine.apply_overrides_from(|name| match name {
        "PASSFORGE_SUPABASE_URL" => Some("https://proj.supabase.co".to_string()),
        "PASSFORGE_SUPABASE_ANON_KEY" => Some("anon-key".to_string()),
        _ => None,
    });

    let settings = engine.into_settings();
    assert_eq!(settings.remote.url.as_deref(), Some("https://proj.supabase.co"));
    assert_eq!(settings.remote.anon_key.as_deref(), Some("anon-key"));
    assert!(settings.remote.is_configured());
}

#[test]
fn test_get_value_reads_one_key() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.set_value("history.capacity", serde_json::json!(25)).unwrap();

    assert_eq!(engine.get_value("history.capacity").unwrap(), serde_json::json!(25));
    assert_eq!(engine.get_value("storage.scope").unwrap(), serde_json::json!("profile"));
    assert_eq!(engine.get_value("history").unwrap()["generation_log_capacity"], 50);
    assert!(matches!(
        engine.get_value("history.nonexistent"),
        Err(SettingsError::InvalidKey(_))
    ));
    assert!(matches!(engine.get_value(""), Err(SettingsError::InvalidKey(_))));
}

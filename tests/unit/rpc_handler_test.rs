//! Unit tests for the RPC handler: the JSON-RPC methods dispatched by `handle_method`.
//!
//! These tests go through the same code path as the real `passforge-rpc`
//! binary, using a temporary on-disk SQLite database and settings file.
//! Most tests run local only; the sync tests wire in-memory backends.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tempfile::TempDir;

use passforge::app::App;
use passforge::database::Database;
use passforge::rpc_handler::handle_method;
use passforge::services::auth_service::AuthClient;
use passforge::services::remote_store::RemoteStore;
use passforge::services::settings_engine::SettingsEngine;
use passforge::types::auth::{Credentials, Session, User};
use passforge::types::errors::{AuthError, RemoteError};
use passforge::types::history::HistoryEntry;
use passforge::types::settings::AppSettings;

/// Remote holding one favorite row for every user.
struct OneRowRemote;

#[async_trait]
impl RemoteStore for OneRowRemote {
    async fn upsert(&self, _session: &Session, _entry: &HistoryEntry) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn list_by_user(&self, _session: &Session) -> Result<Vec<HistoryEntry>, RemoteError> {
        Ok(vec![HistoryEntry {
            id: "remote-1".to_string(),
            password: "FromCloud99".to_string(),
            created_at: Utc::now(),
            is_favorite: true,
        }])
    }

    async fn delete_by_id(&self, _session: &Session, _id: &str) -> Result<(), RemoteError> {
        Ok(())
    }
}

struct AcceptingAuth;

#[async_trait]
impl AuthClient for AcceptingAuth {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        Ok(Session {
            access_token: "token".to_string(),
            refresh_token: String::new(),
            expires_at: None,
            user: User { id: "user-1".to_string(), email: Some(credentials.email.clone()) },
        })
    }

    async fn sign_up(&self, _credentials: &Credentials) -> Result<Option<Session>, AuthError> {
        Ok(None)
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        Ok(())
    }
}

fn synced_setup() -> Arc<App> {
    let mut settings = AppSettings::default();
    settings.auth.min_interval_ms = 0;
    let db = Arc::new(Database::open_in_memory().expect("Failed to open in-memory database"));
    let auth: Arc<dyn AuthClient> = Arc::new(AcceptingAuth);
    let remote: Arc<dyn RemoteStore> = Arc::new(OneRowRemote);
    Arc::new(App::with_backends(settings, db, Some(auth), Some(remote)).expect("Failed to init App"))
}

/// Create a fresh App backed by a temp directory DB and settings file.
fn setup() -> (Arc<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let mut settings = AppSettings::default();
    settings.storage.database_path = Some(tmp.path().join("test.db").to_string_lossy().to_string());
    settings.scheduler.debounce_ms = 20;

    let engine = SettingsEngine::new(Some(tmp.path().join("settings.json").to_string_lossy().to_string()));
    let app = App::new(settings).expect("Failed to init App").with_settings_engine(engine);
    (Arc::new(app), tmp)
}

async fn call(app: &Arc<App>, method: &str, params: Value) -> Value {
    handle_method(app, method, &params)
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", method, e))
}

// ─── Ping ───

#[tokio::test]
async fn test_ping() {
    let (app, _tmp) = setup();
    assert_eq!(call(&app, "ping", json!({})).await, json!({"pong": true}));
}

// ─── Unknown method ───

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Generator ───

#[tokio::test]
async fn test_config_get_and_update() {
    let (app, _tmp) = setup();

    let config = call(&app, "config.get", json!({})).await;
    assert_eq!(config["length"], 16);

    let updated = call(&app, "config.update", json!({"config": {"length": 20, "include_symbols": true}})).await;
    assert_eq!(updated["length"], 20);
    assert_eq!(updated["include_symbols"], true);
    assert_eq!(call(&app, "config.get", json!({})).await["length"], 20);
}

#[tokio::test]
async fn test_config_update_rejects_bad_length() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "config.update", &json!({"config": {"length": 4}}))
        .await
        .unwrap_err();
    assert!(err.contains("out of range"), "got {}", err);
}

#[tokio::test]
async fn test_password_generate_with_overrides() {
    let (app, _tmp) = setup();

    let res = call(
        &app,
        "password.generate",
        json!({"config": {"length": 12, "include_uppercase": false, "include_numbers": false}}),
    )
    .await;

    let password = res["password"].as_str().unwrap();
    assert_eq!(password.len(), 12);
    assert!(password.chars().all(|c| c.is_ascii_lowercase()));
    assert_eq!(res["entry"]["password"], password);
    assert!(res["entropy_bits"].as_f64().unwrap() > 0.0);

    let current = call(&app, "password.current", json!({})).await;
    assert_eq!(current["password"], password);
}

#[tokio::test]
async fn test_password_generate_empty_charset_errors() {
    let (app, _tmp) = setup();
    let res = handle_method(
        &app,
        "password.generate",
        &json!({"config": {
            "include_lowercase": false,
            "include_uppercase": false,
            "include_numbers": false,
            "include_symbols": false
        }}),
    )
    .await;
    assert!(res.unwrap_err().contains("Invalid configuration"));
}

#[tokio::test]
async fn test_password_schedule_generates_once() {
    let (app, _tmp) = setup();

    for _ in 0..3 {
        let res = call(&app, "password.schedule", json!({})).await;
        assert_eq!(res["scheduled"], true);
    }
    tokio::time::sleep(std::time::Duration::from_millis(120)).await;

    let list = call(&app, "history.list", json!({})).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

// ─── History ───

#[tokio::test]
async fn test_history_flow() {
    let (app, _tmp) = setup();
    let first = call(&app, "password.generate", json!({})).await;
    call(&app, "password.generate", json!({})).await;
    let id = first["entry"]["id"].as_str().unwrap().to_string();

    let toggled = call(&app, "history.toggle_favorite", json!({"id": id})).await;
    assert_eq!(toggled["found"], true);
    assert_eq!(toggled["entry"]["isFavorite"], true);

    let favorites = call(&app, "history.list", json!({"view": "favorites"})).await;
    assert_eq!(favorites.as_array().unwrap().len(), 1);

    let cleared = call(&app, "history.clear", json!({})).await;
    assert_eq!(cleared["removed"], 1);

    let all = call(&app, "history.list", json!({"view": "all"})).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["id"], id);

    let removed = call(&app, "history.remove", json!({"id": id})).await;
    assert_eq!(removed["removed"], true);
    assert_eq!(call(&app, "history.list", json!({})).await, json!([]));
}

#[tokio::test]
async fn test_history_unknown_id_is_not_an_error() {
    let (app, _tmp) = setup();
    let res = call(&app, "history.toggle_favorite", json!({"id": "nope"})).await;
    assert_eq!(res["found"], false);
    let res = call(&app, "history.remove", json!({"id": "nope"})).await;
    assert_eq!(res["removed"], false);
}

#[tokio::test]
async fn test_history_missing_id_param() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "history.remove", &json!({})).await.unwrap_err();
    assert_eq!(err, "missing id");
}

#[tokio::test]
async fn test_history_invalid_view() {
    let (app, _tmp) = setup();
    assert!(handle_method(&app, "history.list", &json!({"view": "recent"})).await.is_err());
}

#[tokio::test]
async fn test_generation_log() {
    let (app, _tmp) = setup();
    call(&app, "password.generate", json!({})).await;
    let log = call(&app, "history.log", json!({})).await;
    assert_eq!(log.as_array().unwrap().len(), 1);
}

// ─── Auth / Sync (local only) ───

#[tokio::test]
async fn test_auth_without_backend() {
    let (app, _tmp) = setup();

    assert_eq!(call(&app, "auth.session", json!({})).await, json!({"signed_in": false}));
    let err = handle_method(&app, "auth.sign_in", &json!({"email": "a@b.c", "password": "pw"}))
        .await
        .unwrap_err();
    assert_eq!(err, "Auth backend not configured");
}

#[tokio::test]
async fn test_sync_without_backend() {
    let (app, _tmp) = setup();

    assert_eq!(call(&app, "sync.state", json!({})).await, json!({"state": "logged_out"}));
    let err = handle_method(&app, "sync.now", &json!({})).await.unwrap_err();
    assert!(err.contains("not configured"), "got {}", err);
}

#[tokio::test]
async fn test_notices_start_empty() {
    let (app, _tmp) = setup();
    assert_eq!(call(&app, "notices.drain", json!({})).await, json!([]));
}

// ─── Settings ───

#[tokio::test]
async fn test_settings_get_and_set() {
    let (app, tmp) = setup();

    let settings = call(&app, "settings.get", json!({})).await;
    assert_eq!(settings["history"]["capacity"], 10);

    let res = call(&app, "settings.set", json!({"key": "history.capacity", "value": 20})).await;
    assert_eq!(res["restart_required"], true);
    assert_eq!(call(&app, "settings.get", json!({})).await["history"]["capacity"], 20);
    assert!(tmp.path().join("settings.json").exists());
}

#[tokio::test]
async fn test_settings_set_invalid_key() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "settings.set", &json!({"key": "nope.key", "value": 1})).await;
    assert!(res.unwrap_err().contains("Invalid settings key"));
}

#[tokio::test]
async fn test_sync_now_returns_structured_outcome() {
    let app = synced_setup();
    call(&app, "auth.sign_in", json!({"email": "a@b.c", "password": "pw"})).await;

    let result = call(&app, "sync.now", json!({})).await;

    assert_eq!(result["outcome"]["kind"], "merged");
    assert_eq!(result["outcome"]["added"], 0);
    assert_eq!(result["outcome"]["conflicts"], 1);
    assert_eq!(result["outcome"]["total"], 1);
    assert_eq!(result["state"]["state"], "synced");
}

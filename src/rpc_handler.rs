//! RPC method handler for the passforge JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! application context.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::app::App;
use crate::types::history::HistoryView;
use crate::types::password::ConfigOverrides;

fn param_str<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", name))
}

/// Reads optional config overrides from `params` (absent or null means none).
fn overrides(params: &Value) -> Result<ConfigOverrides, String> {
    match params.get("config") {
        None | Some(Value::Null) => Ok(ConfigOverrides::default()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| format!("invalid config: {}", e)),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call to the application context.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &Arc<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Generator ───
        "config.get" => to_json(&app.config()),
        "config.update" => {
            let overrides = overrides(params)?;
            let config = app.update_config(&overrides).map_err(|e| e.to_string())?;
            if params.get("regenerate").and_then(|v| v.as_bool()).unwrap_or(false) {
                app.request_generation();
            }
            to_json(&config)
        }
        "password.generate" => {
            let overrides = overrides(params)?;
            let generated = app
                .generate((!overrides.is_empty()).then_some(&overrides))
                .map_err(|e| e.to_string())?;
            to_json(&generated)
        }
        "password.schedule" => {
            app.request_generation();
            Ok(json!({"scheduled": true, "delay_ms": app.settings().scheduler.debounce_ms}))
        }
        "password.current" => Ok(json!({"password": app.current_password()})),

        // ─── History ───
        "history.list" => {
            let view: HistoryView = match params.get("view") {
                None | Some(Value::Null) => HistoryView::All,
                Some(v) => serde_json::from_value(v.clone()).map_err(|e| format!("invalid view: {}", e))?,
            };
            to_json(&app.history(view))
        }
        "history.log" => to_json(&app.generation_log()),
        "history.toggle_favorite" => {
            let id = param_str(params, "id")?;
            let entry = app.toggle_favorite(id).await.map_err(|e| e.to_string())?;
            Ok(json!({"found": entry.is_some(), "entry": entry}))
        }
        "history.remove" => {
            let id = param_str(params, "id")?;
            let removed = app.remove(id).await.map_err(|e| e.to_string())?;
            Ok(json!({"removed": removed.is_some()}))
        }
        "history.clear" => {
            let removed = app.clear_history().map_err(|e| e.to_string())?;
            Ok(json!({"removed": removed}))
        }

        // ─── Sync ───
        "sync.now" => {
            let outcome = app.sync_now().await.map_err(|e| e.to_string())?;
            Ok(json!({"outcome": to_json(&outcome)?, "state": to_json(&app.sync_state())?}))
        }
        "sync.state" => to_json(&app.sync_state()),

        // ─── Auth ───
        "auth.sign_in" => {
            let email = param_str(params, "email")?;
            let password = param_str(params, "password")?;
            let session = app.sign_in(email, password).await.map_err(|e| e.to_string())?;
            Ok(json!({"user": session.user, "expires_at": session.expires_at}))
        }
        "auth.sign_up" => {
            let email = param_str(params, "email")?;
            let password = param_str(params, "password")?;
            let session = app.sign_up(email, password).await.map_err(|e| e.to_string())?;
            Ok(json!({
                "confirmation_required": session.is_none(),
                "user": session.as_ref().map(|s| s.user.clone()),
            }))
        }
        "auth.sign_out" => {
            app.sign_out().await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "auth.session" => match app.session() {
            Some(session) => Ok(json!({
                "signed_in": true,
                "user": session.user,
                "expires_at": session.expires_at,
            })),
            None => Ok(json!({"signed_in": false})),
        },

        // ─── Notices ───
        "notices.drain" => to_json(&app.drain_notices()),

        // ─── Settings ───
        "settings.get" => to_json(&app.stored_settings()),
        "settings.set" => {
            let key = param_str(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            app.set_setting(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "restart_required": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}

//! App Core for passforge.
//!
//! Central context holding the generator, history, persistence and the
//! optional remote backends. Passed explicitly to the RPC handler and the CLI;
//! there is no global state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::database::connection::Database;
use crate::managers::generation_log::GenerationLog;
use crate::managers::generation_scheduler::DebounceTimer;
use crate::managers::history_manager::{HistoryManager, HistoryManagerTrait};
use crate::managers::sync_manager::{SyncManager, SyncOutcome, SyncState};
use crate::platform;
use crate::services::auth_service::{AuthClient, AuthService, RestAuthClient};
use crate::services::local_store::SqliteKeyValueStore;
use crate::services::password_generator::{PasswordGenerator, PasswordGeneratorTrait};
use crate::services::preferences::Preferences;
use crate::services::remote_store::{RemoteStore, RestRemoteStore};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::auth::Session;
use crate::types::errors::{
    AppError, AuthError, GeneratorError, HistoryError, RemoteError, SettingsError, SyncError,
};
use crate::types::history::{GenerationRecord, HistoryEntry, HistoryView};
use crate::types::notice::Notice;
use crate::types::password::{ConfigOverrides, PasswordConfig, MAX_LENGTH, MIN_LENGTH};
use crate::types::settings::{AppSettings, StorageScope};

/// Result of one generation.
#[derive(Debug, Clone, Serialize)]
pub struct Generated {
    pub password: String,
    pub entry: HistoryEntry,
    pub entropy_bits: f64,
}

/// Central application context.
pub struct App {
    settings: AppSettings,
    db: Arc<Database>,
    generator: PasswordGenerator,
    preferences: Preferences,
    config: Mutex<PasswordConfig>,
    history: Mutex<HistoryManager>,
    generation_log: Mutex<GenerationLog>,
    auth: Option<AuthService>,
    sync: Option<SyncManager>,
    scheduler: Mutex<DebounceTimer>,
    notices: Mutex<Vec<Notice>>,
    settings_engine: Option<Mutex<SettingsEngine>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl App {
    /// Opens the database from settings and connects the remote backend when
    /// it is configured. Without one the app runs local-only.
    pub fn new(settings: AppSettings) -> Result<Self, AppError> {
        let db_path = settings
            .storage
            .database_path
            .clone()
            .map(std::path::PathBuf::from)
            .unwrap_or_else(platform::default_database_path);
        let db = Arc::new(Database::open(&db_path)?);

        let (auth_client, remote) = if settings.remote.is_configured() {
            let auth: Arc<dyn AuthClient> = Arc::new(RestAuthClient::new(&settings.remote)?);
            let remote: Arc<dyn RemoteStore> =
                Arc::new(RestRemoteStore::new(&settings.remote).map_err(SyncError::from)?);
            (Some(auth), Some(remote))
        } else {
            log::info!("remote backend not configured, running local only");
            (None, None)
        };

        Self::with_backends(settings, db, auth_client, remote)
    }

    /// Builds the context around explicit collaborators.
    pub fn with_backends(
        settings: AppSettings,
        db: Arc<Database>,
        auth_client: Option<Arc<dyn AuthClient>>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Result<Self, AppError> {
        // Session-scoped values never outlive one run.
        let session_store = SqliteKeyValueStore::new(db.clone(), StorageScope::Session);
        let wiped = session_store.clear_scope()?;
        if wiped > 0 {
            log::debug!("cleared {} session-scoped values", wiped);
        }

        let preferences = Preferences::new(Arc::new(SqliteKeyValueStore::new(
            db.clone(),
            settings.storage.scope,
        )));
        let profile = Preferences::new(Arc::new(SqliteKeyValueStore::new(
            db.clone(),
            StorageScope::Profile,
        )));

        let config = preferences.load_config(&settings.generator);
        let history = HistoryManager::with_entries(settings.history.capacity, preferences.load_history());
        let generation_log = GenerationLog::with_records(
            settings.history.generation_log_capacity,
            preferences.load_generation_log(),
        );
        log::info!(
            "loaded {} history entries ({} scope)",
            history.len(),
            settings.storage.scope.as_str()
        );

        let auth = auth_client.map(|client| {
            AuthService::new(client, Duration::from_millis(settings.auth.min_interval_ms))
                .with_persistence(profile)
        });
        let sync = remote.map(SyncManager::new);
        let scheduler = DebounceTimer::new(Duration::from_millis(settings.scheduler.debounce_ms));

        Ok(Self {
            settings,
            db,
            generator: PasswordGenerator::new(),
            preferences,
            config: Mutex::new(config),
            history: Mutex::new(history),
            generation_log: Mutex::new(generation_log),
            auth,
            sync,
            scheduler: Mutex::new(scheduler),
            notices: Mutex::new(Vec::new()),
            settings_engine: None,
        })
    }

    /// Hands the settings file to the app so `settings.*` RPC calls can edit it.
    pub fn with_settings_engine(mut self, engine: SettingsEngine) -> Self {
        self.settings_engine = Some(Mutex::new(engine));
        self
    }

    /// Settings this app was started with.
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Settings as currently stored on disk, falling back to the startup ones.
    pub fn stored_settings(&self) -> AppSettings {
        match &self.settings_engine {
            Some(engine) => lock(engine).get_settings().clone(),
            None => self.settings.clone(),
        }
    }

    /// Updates one stored setting by dot path. Takes effect on the next start.
    pub fn set_setting(&self, key: &str, value: serde_json::Value) -> Result<(), AppError> {
        let engine = self.settings_engine.as_ref().ok_or_else(|| {
            SettingsError::IoError("no settings file attached".to_string())
        })?;
        lock(engine).set_value(key, value)?;
        Ok(())
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    // ─── Generator ───

    pub fn config(&self) -> PasswordConfig {
        lock(&self.config).clone()
    }

    /// Applies a partial update to the stored config. An out-of-range length
    /// is rejected and leaves the config unchanged.
    pub fn update_config(&self, overrides: &ConfigOverrides) -> Result<PasswordConfig, AppError> {
        let mut config = lock(&self.config);
        let updated = config.with_overrides(overrides);
        if !updated.length_in_range() {
            return Err(GeneratorError::LengthOutOfRange {
                length: updated.length,
                min: MIN_LENGTH,
                max: MAX_LENGTH,
            }
            .into());
        }
        self.preferences.save_config(&updated)?;
        self.preferences.set_should_generate_password(true)?;
        *config = updated.clone();
        Ok(updated)
    }

    /// Generates with the stored config (plus one-off `overrides`) and records
    /// the result in history and the generation log.
    pub fn generate(&self, overrides: Option<&ConfigOverrides>) -> Result<Generated, AppError> {
        let config = match overrides {
            Some(o) => self.config().with_overrides(o),
            None => self.config(),
        };
        let password = self.generator.generate(&config)?;
        let entropy_bits = self.generator.entropy_bits(&config);

        // Each structure is persisted before the in-memory copy is replaced.
        let entry = {
            let mut history = lock(&self.history);
            let mut next = history.clone();
            let entry = next.record(&password);
            self.preferences.save_history(next.entries())?;
            *history = next;
            entry
        };
        {
            let mut log = lock(&self.generation_log);
            let mut next = log.clone();
            if next.push(&password).is_some() {
                self.preferences.save_generation_log(next.records())?;
                *log = next;
            }
        }
        self.preferences.set_current_password(&password)?;
        self.preferences.set_should_generate_password(false)?;

        Ok(Generated {
            password,
            entry,
            entropy_bits,
        })
    }

    /// Generates once if the config changed (or nothing was generated yet)
    /// since the last generation.
    pub fn generate_if_requested(&self) -> Result<Option<Generated>, AppError> {
        if !self.preferences.should_generate_password() {
            return Ok(None);
        }
        self.generate(None).map(Some)
    }

    /// Debounced generation: each call supersedes the pending one.
    pub fn request_generation(self: &Arc<Self>) {
        let app = Arc::downgrade(self);
        lock(&self.scheduler).schedule(async move {
            let Some(app) = app.upgrade() else {
                return;
            };
            if let Err(e) = app.generate(None) {
                log::warn!("scheduled generation failed: {}", e);
            }
        });
    }

    pub fn generation_pending(&self) -> bool {
        lock(&self.scheduler).is_pending()
    }

    pub fn current_password(&self) -> Option<String> {
        self.preferences.current_password()
    }

    // ─── History ───

    pub fn history(&self, view: HistoryView) -> Vec<HistoryEntry> {
        lock(&self.history).view(view)
    }

    pub fn generation_log(&self) -> Vec<GenerationRecord> {
        lock(&self.generation_log).records().to_vec()
    }

    /// Flips a favorite. An unknown id is a logged no-op (`Ok(None)`).
    /// A new favorite is mirrored remotely when signed in.
    pub async fn toggle_favorite(&self, id: &str) -> Result<Option<HistoryEntry>, AppError> {
        let entry = {
            let mut history = lock(&self.history);
            match history.toggle_favorite(id) {
                Ok(entry) => {
                    self.preferences.save_history(history.entries())?;
                    entry
                }
                Err(HistoryError::NotFound(id)) => {
                    log::debug!("toggle_favorite: no entry {}", id);
                    return Ok(None);
                }
            }
        };

        if let (Some(sync), Some(session)) = (&self.sync, self.session()) {
            if let Err(e) = sync.mirror_favorite(&session, &entry).await {
                self.notify("favorite", &e);
            }
        }
        Ok(Some(entry))
    }

    /// Removes locally, then requests a remote delete when signed in.
    pub async fn remove(&self, id: &str) -> Result<Option<HistoryEntry>, AppError> {
        let removed = {
            let mut history = lock(&self.history);
            match history.remove(id) {
                Ok(entry) => {
                    self.preferences.save_history(history.entries())?;
                    entry
                }
                Err(HistoryError::NotFound(id)) => {
                    log::debug!("remove: no entry {}", id);
                    return Ok(None);
                }
            }
        };

        if let (Some(sync), Some(session)) = (&self.sync, self.session()) {
            if let Err(e) = sync.mirror_removal(&session, &removed.id).await {
                self.notify("remove", &e);
            }
        }
        Ok(Some(removed))
    }

    /// Removes every non-favorite entry. Returns the number removed.
    pub fn clear_history(&self) -> Result<usize, AppError> {
        let mut history = lock(&self.history);
        let removed = history.clear();
        self.preferences.save_history(history.entries())?;
        log::info!("cleared {} history entries", removed);
        Ok(removed)
    }

    // ─── Auth ───

    fn auth(&self) -> Result<&AuthService, AuthError> {
        self.auth.as_ref().ok_or(AuthError::NotConfigured)
    }

    pub fn session(&self) -> Option<Session> {
        self.auth.as_ref().and_then(AuthService::get_session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let session = self.auth()?.sign_in_with_password(email, password).await?;
        self.on_session_change(Some(session.clone())).await;
        Ok(session)
    }

    /// Returns `None` when the account still awaits email confirmation.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AppError> {
        let session = self.auth()?.sign_up(email, password).await?;
        if let Some(s) = &session {
            self.on_session_change(Some(s.clone())).await;
        }
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.auth()?.sign_out().await?;
        self.on_session_change(None).await;
        Ok(())
    }

    /// Reacts to a login or logout. A login triggers the one-per-session sync;
    /// its failure becomes a notice.
    pub async fn on_session_change(&self, session: Option<Session>) -> Option<SyncOutcome> {
        let sync = self.sync.as_ref()?;
        let Some(session) = session else {
            sync.on_logout();
            return None;
        };
        match sync.on_login(&session, &self.history).await {
            Ok(outcome) => {
                if matches!(outcome, SyncOutcome::Merged(_)) {
                    self.persist_history();
                }
                Some(outcome)
            }
            Err(e) => {
                self.notify("sync", &e);
                None
            }
        }
    }

    /// Follows the auth state channel, running the login hook for the current
    /// session and every later change. Ends when the app is dropped.
    pub fn spawn_auth_watcher(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut changes = self.auth.as_ref()?.on_auth_state_change();
        let app = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            loop {
                let session = changes.borrow_and_update().clone();
                match app.upgrade() {
                    Some(app) => {
                        app.on_session_change(session).await;
                    }
                    None => break,
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        }))
    }

    // ─── Sync ───

    /// Explicit sync for the signed-in user.
    pub async fn sync_now(&self) -> Result<SyncOutcome, AppError> {
        let sync = self
            .sync
            .as_ref()
            .ok_or(SyncError::Remote(RemoteError::NotConfigured))?;
        let session = self.session().ok_or(SyncError::NotSignedIn)?;
        let outcome = sync.sync_remote(&session, &self.history).await?;
        if matches!(outcome, SyncOutcome::Merged(_)) {
            self.persist_history();
        }
        Ok(outcome)
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync
            .as_ref()
            .map_or(SyncState::LoggedOut, SyncManager::state)
    }

    fn persist_history(&self) {
        let history = lock(&self.history);
        if let Err(e) = self.preferences.save_history(history.entries()) {
            log::warn!("failed to persist history after sync: {}", e);
        }
    }

    // ─── Notices ───

    fn notify(&self, operation: &str, error: &dyn std::fmt::Display) {
        log::warn!("{} failed remotely: {}", operation, error);
        lock(&self.notices).push(Notice::new(operation, error.to_string()));
    }

    /// Returns and clears pending notices, oldest first.
    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *lock(&self.notices))
    }
}

//! Remote synchronization of history.
//!
//! On login the user's remote records are fetched and merged into local
//! history exactly once per session. The state machine is
//! `LoggedOut -> SyncPending -> Synced | Unsynced`, keyed by the session
//! fingerprint so a repeated login event for the same session is a no-op and
//! a result arriving after the session changed is discarded.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::managers::history_manager::{HistoryManager, HistoryManagerTrait};
use crate::services::remote_store::RemoteStore;
use crate::types::auth::Session;
use crate::types::errors::{RemoteError, SyncError};
use crate::types::history::{HistoryEntry, MergeReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    LoggedOut,
    SyncPending { session: String },
    Synced { session: String, report: MergeReport },
    Unsynced { session: String, reason: String },
}

impl SyncState {
    fn session_key(&self) -> Option<&str> {
        match self {
            SyncState::LoggedOut => None,
            SyncState::SyncPending { session }
            | SyncState::Synced { session, .. }
            | SyncState::Unsynced { session, .. } => Some(session),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncOutcome {
    Merged(MergeReport),
    /// A sync for this session is already running.
    AlreadyInFlight,
    /// This session has already been merged.
    AlreadySynced,
    /// The session changed while the fetch was running; the result was dropped.
    Stale,
}

pub struct SyncManager {
    remote: Arc<dyn RemoteStore>,
    state: Mutex<SyncState>,
}

impl SyncManager {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            state: Mutex::new(SyncState::LoggedOut),
        }
    }

    pub fn state(&self) -> SyncState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Moves to `SyncPending` for `key`, or reports why no sync is needed.
    fn begin(&self, key: &str, force: bool) -> Option<SyncOutcome> {
        let mut state = self.lock_state();
        match &*state {
            SyncState::SyncPending { session } if session == key => {
                return Some(SyncOutcome::AlreadyInFlight)
            }
            SyncState::Synced { session, .. } if session == key && !force => {
                return Some(SyncOutcome::AlreadySynced)
            }
            _ => {}
        }
        *state = SyncState::SyncPending {
            session: key.to_string(),
        };
        None
    }

    /// Login hook: merges remote history once per session.
    pub async fn on_login(
        &self,
        session: &Session,
        history: &Mutex<HistoryManager>,
    ) -> Result<SyncOutcome, SyncError> {
        self.run(session, history, false).await
    }

    /// Explicit sync: merges again even if this session already synced.
    pub async fn sync_remote(
        &self,
        session: &Session,
        history: &Mutex<HistoryManager>,
    ) -> Result<SyncOutcome, SyncError> {
        self.run(session, history, true).await
    }

    async fn run(
        &self,
        session: &Session,
        history: &Mutex<HistoryManager>,
        force: bool,
    ) -> Result<SyncOutcome, SyncError> {
        let key = session.fingerprint();
        if let Some(outcome) = self.begin(&key, force) {
            log::debug!("sync skipped: {:?}", outcome);
            return Ok(outcome);
        }

        log::info!("syncing history for user {}", session.user.id);
        let fetched = self.remote.list_by_user(session).await;

        let mut state = self.lock_state();
        if state.session_key() != Some(key.as_str())
            || !matches!(&*state, SyncState::SyncPending { .. })
        {
            log::info!("discarding sync result for a session that is no longer current");
            return Ok(SyncOutcome::Stale);
        }

        match fetched {
            Ok(remote) => {
                let report = history
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .merge_remote(remote);
                log::info!(
                    "sync merged: {} added, {} conflicts, {} evicted",
                    report.added,
                    report.conflicts,
                    report.evicted
                );
                *state = SyncState::Synced {
                    session: key,
                    report: report.clone(),
                };
                Ok(SyncOutcome::Merged(report))
            }
            Err(e) => {
                log::warn!("sync failed: {}", e);
                *state = SyncState::Unsynced {
                    session: key,
                    reason: e.to_string(),
                };
                Err(SyncError::Remote(e))
            }
        }
    }

    /// Logout hook. Any in-flight sync becomes stale.
    pub fn on_logout(&self) {
        *self.lock_state() = SyncState::LoggedOut;
    }

    /// Pushes a favorited entry to the remote. Un-favoriting is local only.
    /// Returns whether a remote write happened.
    pub async fn mirror_favorite(
        &self,
        session: &Session,
        entry: &HistoryEntry,
    ) -> Result<bool, RemoteError> {
        if !entry.is_favorite {
            return Ok(false);
        }
        self.remote.upsert(session, entry).await?;
        Ok(true)
    }

    pub async fn mirror_removal(&self, session: &Session, id: &str) -> Result<(), RemoteError> {
        self.remote.delete_by_id(session, id).await
    }
}

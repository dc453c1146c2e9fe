//! Unit tests for the SyncManager lifecycle: one merge per login session,
//! single-flight fetches, stale results and remote mirroring.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use passforge::managers::history_manager::{HistoryManager, HistoryManagerTrait};
use passforge::managers::sync_manager::{SyncManager, SyncOutcome, SyncState};
use passforge::services::remote_store::RemoteStore;
use passforge::types::auth::{Session, User};
use passforge::types::errors::{RemoteError, SyncError};
use passforge::types::history::HistoryEntry;
use std::sync::Arc;

/// In-memory remote with call counters and an artificial latency.
#[derive(Default)]
struct FakeRemote {
    rows: Mutex<Vec<HistoryEntry>>,
    list_calls: AtomicUsize,
    upserts: Mutex<Vec<HistoryEntry>>,
    deletes: Mutex<Vec<String>>,
    fail: AtomicBool,
    delay_ms: u64,
}

impl FakeRemote {
    fn with_rows(rows: Vec<HistoryEntry>, delay_ms: u64) -> Self {
        Self {
            rows: Mutex::new(rows),
            delay_ms,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable("offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn upsert(&self, _session: &Session, entry: &HistoryEntry) -> Result<(), RemoteError> {
        self.check()?;
        self.upserts.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list_by_user(&self, _session: &Session) -> Result<Vec<HistoryEntry>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        self.check()?;
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn delete_by_id(&self, _session: &Session, id: &str) -> Result<(), RemoteError> {
        self.check()?;
        self.deletes.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

fn session(token: &str) -> Session {
    Session {
        access_token: token.to_string(),
        refresh_token: String::new(),
        expires_at: None,
        user: User { id: "user-1".to_string(), email: None },
    }
}

fn remote_entry(id: &str) -> HistoryEntry {
    HistoryEntry {
        id: id.to_string(),
        password: format!("remote-{}", id),
        created_at: Utc::now(),
        is_favorite: true,
    }
}

fn setup(rows: Vec<HistoryEntry>, delay_ms: u64) -> (Arc<FakeRemote>, SyncManager, Mutex<HistoryManager>) {
    let remote = Arc::new(FakeRemote::with_rows(rows, delay_ms));
    let sync = SyncManager::new(remote.clone());
    (remote, sync, Mutex::new(HistoryManager::new(10)))
}

#[tokio::test]
async fn test_login_merges_remote_history() {
    let (remote, sync, history) = setup(vec![remote_entry("r1"), remote_entry("r2")], 0);
    assert_eq!(sync.state(), SyncState::LoggedOut);

    let outcome = sync.on_login(&session("t1"), &history).await.unwrap();

    match outcome {
        SyncOutcome::Merged(report) => assert_eq!(report.added, 2),
        other => panic!("expected a merge, got {:?}", other),
    }
    assert_eq!(history.lock().unwrap().len(), 2);
    assert!(matches!(sync.state(), SyncState::Synced { .. }));
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_login_event_is_a_no_op() {
    let (remote, sync, history) = setup(vec![remote_entry("r1")], 0);
    let s = session("t1");

    sync.on_login(&s, &history).await.unwrap();
    let again = sync.on_login(&s, &history).await.unwrap();

    assert_eq!(again, SyncOutcome::AlreadySynced);
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_logins_fetch_once() {
    let (remote, sync, history) = setup(vec![remote_entry("r1")], 50);
    let s = session("t1");

    let (a, b) = tokio::join!(sync.on_login(&s, &history), sync.on_login(&s, &history));
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.retain(|o| *o != SyncOutcome::AlreadyInFlight);

    assert_eq!(outcomes.len(), 1, "exactly one call performs the merge");
    assert!(matches!(outcomes[0], SyncOutcome::Merged(_)));
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_explicit_sync_is_idempotent() {
    let (remote, sync, history) = setup(vec![remote_entry("r1"), remote_entry("r2")], 0);
    history.lock().unwrap().record("local");
    let s = session("t1");

    sync.sync_remote(&s, &history).await.unwrap();
    let first = history.lock().unwrap().entries().to_vec();
    sync.sync_remote(&s, &history).await.unwrap();

    assert_eq!(history.lock().unwrap().entries(), first.as_slice());
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failure_marks_unsynced_and_allows_retry() {
    let (remote, sync, history) = setup(vec![remote_entry("r1")], 0);
    remote.fail.store(true, Ordering::SeqCst);
    let s = session("t1");

    let err = sync.on_login(&s, &history).await.unwrap_err();
    assert!(matches!(err, SyncError::Remote(RemoteError::Unavailable(_))));
    assert!(matches!(sync.state(), SyncState::Unsynced { .. }));
    assert!(history.lock().unwrap().is_empty());

    remote.fail.store(false, Ordering::SeqCst);
    let outcome = sync.on_login(&s, &history).await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Merged(_)));
}

#[tokio::test]
async fn test_logout_during_fetch_discards_result() {
    let (_remote, sync, history) = setup(vec![remote_entry("r1")], 50);
    let s = session("t1");

    let (outcome, _) = tokio::join!(sync.on_login(&s, &history), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        sync.on_logout();
    });

    assert_eq!(outcome.unwrap(), SyncOutcome::Stale);
    assert!(history.lock().unwrap().is_empty());
    assert_eq!(sync.state(), SyncState::LoggedOut);
}

#[tokio::test]
async fn test_new_session_supersedes_pending_one() {
    let (remote, sync, history) = setup(vec![remote_entry("r1")], 50);
    let old = session("old");
    let new = session("new");

    let (first, second) = tokio::join!(sync.on_login(&old, &history), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        sync.on_login(&new, &history).await
    });

    assert_eq!(first.unwrap(), SyncOutcome::Stale);
    assert!(matches!(second.unwrap(), SyncOutcome::Merged(_)));
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(history.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_mirror_favorite_only_upserts_favorites() {
    let (remote, sync, _history) = setup(Vec::new(), 0);
    let s = session("t1");
    let mut entry = remote_entry("e1");

    assert!(sync.mirror_favorite(&s, &entry).await.unwrap());
    entry.is_favorite = false;
    assert!(!sync.mirror_favorite(&s, &entry).await.unwrap());

    assert_eq!(remote.upserts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_mirror_removal_deletes_by_id() {
    let (remote, sync, _history) = setup(Vec::new(), 0);
    sync.mirror_removal(&session("t1"), "e1").await.unwrap();
    assert_eq!(*remote.deletes.lock().unwrap(), vec!["e1".to_string()]);
}

#[test]
fn test_outcome_serializes_with_kind_tag() {
    assert_eq!(
        serde_json::to_value(SyncOutcome::AlreadyInFlight).unwrap(),
        serde_json::json!({"kind": "already_in_flight"})
    );
    let merged = serde_json::to_value(SyncOutcome::Merged(Default::default())).unwrap();
    assert_eq!(merged["kind"], "merged");
    assert_eq!(merged["total"], 0);
}

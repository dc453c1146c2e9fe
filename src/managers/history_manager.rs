//! History Manager for passforge.
//!
//! Implements `HistoryManagerTrait`: a bounded, newest-first list of generated
//! passwords with favorite flags. The manager is purely in-memory; the
//! application context snapshots it into the local store after each change.
//!
//! When the bound is exceeded, entries are ranked favorites first, then by
//! recency, and the lowest-ranked entries are dropped. A freshly recorded
//! entry is never the one evicted.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::types::errors::HistoryError;
use crate::types::history::{HistoryEntry, HistoryView, MergeReport};

/// Number of entries kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Trait defining history management operations.
pub trait HistoryManagerTrait {
    fn record(&mut self, password: &str) -> HistoryEntry;
    fn toggle_favorite(&mut self, id: &str) -> Result<HistoryEntry, HistoryError>;
    fn remove(&mut self, id: &str) -> Result<HistoryEntry, HistoryError>;
    fn clear(&mut self) -> usize;
    fn merge_remote(&mut self, remote: Vec<HistoryEntry>) -> MergeReport;
    fn entries(&self) -> &[HistoryEntry];
    fn get(&self, id: &str) -> Option<&HistoryEntry>;
    fn capacity(&self) -> usize;
}

/// In-memory history store.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl HistoryManager {
    /// Creates an empty history holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuilds a history from a newest-first snapshot.
    ///
    /// Duplicate ids keep their first occurrence; the bound is enforced.
    pub fn with_entries(capacity: usize, entries: Vec<HistoryEntry>) -> Self {
        let mut seen = HashSet::new();
        let mut manager = Self::new(capacity);
        manager.entries = entries
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .collect();
        let evicted = manager.enforce_bound(None);
        if evicted > 0 {
            log::debug!("dropped {} entries over capacity while restoring", evicted);
        }
        manager
    }

    /// Lazy view over the entries matching `predicate`. Never mutates.
    pub fn filter<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a HistoryEntry> + 'a
    where
        P: FnMut(&&'a HistoryEntry) -> bool + 'a,
    {
        self.entries.iter().filter(predicate)
    }

    pub fn favorites(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.filter(|e| e.is_favorite)
    }

    /// Owned copy of one view, in display order.
    pub fn view(&self, view: HistoryView) -> Vec<HistoryEntry> {
        match view {
            HistoryView::All => self.entries.clone(),
            HistoryView::Favorites => self.favorites().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops the lowest-ranked entries until the bound holds. Returns how many.
    ///
    /// Rank: the pinned id, then favorites, then position (newest first).
    fn enforce_bound(&mut self, pinned: Option<&str>) -> usize {
        if self.entries.len() <= self.capacity {
            return 0;
        }
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| {
            let entry = &self.entries[i];
            (pinned != Some(entry.id.as_str()), !entry.is_favorite, i)
        });
        let keep: HashSet<usize> = order.into_iter().take(self.capacity).collect();

        let before = self.entries.len();
        let mut index = 0;
        self.entries.retain(|_| {
            let kept = keep.contains(&index);
            index += 1;
            kept
        });
        before - self.entries.len()
    }

    fn position(&self, id: &str) -> Result<usize, HistoryError> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryManagerTrait for HistoryManager {
    /// Prepends a new non-favorite entry and enforces the bound.
    fn record(&mut self, password: &str) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
            is_favorite: false,
        };
        self.entries.insert(0, entry.clone());
        let evicted = self.enforce_bound(Some(&entry.id));
        if evicted > 0 {
            log::debug!("history at capacity {}, evicted {}", self.capacity, evicted);
        }
        entry
    }

    /// Flips the favorite flag and returns the updated entry.
    fn toggle_favorite(&mut self, id: &str) -> Result<HistoryEntry, HistoryError> {
        let index = self.position(id)?;
        let entry = &mut self.entries[index];
        entry.is_favorite = !entry.is_favorite;
        Ok(entry.clone())
    }

    fn remove(&mut self, id: &str) -> Result<HistoryEntry, HistoryError> {
        let index = self.position(id)?;
        Ok(self.entries.remove(index))
    }

    /// Removes every non-favorite entry. Returns the number removed.
    fn clear(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.is_favorite);
        before - self.entries.len()
    }

    /// Merges remote entries by id. Local copies win on conflict; the result
    /// is ordered newest first (ties by id) and bounded.
    fn merge_remote(&mut self, remote: Vec<HistoryEntry>) -> MergeReport {
        let mut report = MergeReport::default();
        let mut ids: HashSet<String> = self.entries.iter().map(|e| e.id.clone()).collect();
        let local_ids = ids.clone();

        for entry in remote {
            if local_ids.contains(&entry.id) {
                report.conflicts += 1;
            } else if ids.insert(entry.id.clone()) {
                report.added += 1;
                self.entries.push(entry);
            }
        }

        self.entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        report.evicted = self.enforce_bound(None);
        report.total = self.entries.len();
        report
    }

    fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

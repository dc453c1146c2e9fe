//! Append-only log of generated passwords, independent of the favorites
//! history. Newest first, bounded; a capacity of zero disables it.

use chrono::Utc;

use crate::types::history::GenerationRecord;

pub const DEFAULT_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct GenerationLog {
    records: Vec<GenerationRecord>,
    capacity: usize,
}

impl GenerationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    /// Restores a newest-first snapshot, truncated to `capacity`.
    pub fn with_records(capacity: usize, mut records: Vec<GenerationRecord>) -> Self {
        records.truncate(capacity);
        Self { records, capacity }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Prepends a record. Returns `None` when the log is disabled.
    pub fn push(&mut self, password: &str) -> Option<&GenerationRecord> {
        if !self.is_enabled() {
            return None;
        }
        self.records.insert(
            0,
            GenerationRecord {
                password: password.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.records.truncate(self.capacity);
        self.records.first()
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

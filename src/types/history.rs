use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded password generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_favorite: bool,
}

/// Entry in the plain generation log (no id, no favorite flag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub password: String,
    pub timestamp: DateTime<Utc>,
}

/// Which slice of history a caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryView {
    #[default]
    All,
    Favorites,
}

/// Summary of a remote merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Remote entries not present locally before the merge.
    pub added: usize,
    /// Entries present on both sides (local copy kept).
    pub conflicts: usize,
    /// Entries dropped to respect the history bound.
    pub evicted: usize,
    /// Size of the history after the merge.
    pub total: usize,
}

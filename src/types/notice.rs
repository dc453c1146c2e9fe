use chrono::{DateTime, Utc};
use serde::Serialize;

/// A best-effort remote operation that failed without blocking the local one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Operation that failed, e.g. `"favorite"`, `"remove"`, `"sync"`.
    pub operation: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(operation: &str, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

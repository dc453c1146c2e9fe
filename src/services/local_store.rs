//! Local key-value persistence for passforge.
//!
//! A string-to-string store with the semantics of browser storage, kept in the
//! SQLite `kv_store` table and partitioned by [`StorageScope`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, OptionalExtension};

use crate::database::connection::Database;
use crate::types::errors::StorageError;
use crate::types::settings::StorageScope;

/// Trait defining key-value storage operations.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Key-value store backed by a shared SQLite database.
pub struct SqliteKeyValueStore {
    db: Arc<Database>,
    scope: StorageScope,
}

impl SqliteKeyValueStore {
    pub fn new(db: Arc<Database>, scope: StorageScope) -> Self {
        Self { db, scope }
    }

    pub fn scope(&self) -> StorageScope {
        self.scope
    }

    /// Deletes every key in this store's scope. Returns the number removed.
    pub fn clear_scope(&self) -> Result<usize, StorageError> {
        let removed = self.db.connection().execute(
            "DELETE FROM kv_store WHERE scope = ?1",
            params![self.scope.as_str()],
        )?;
        Ok(removed)
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .db
            .connection()
            .query_row(
                "SELECT value FROM kv_store WHERE scope = ?1 AND key = ?2",
                params![self.scope.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.connection().execute(
            "INSERT INTO kv_store (scope, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![self.scope.as_str(), key, value, Self::now()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.db.connection().execute(
            "DELETE FROM kv_store WHERE scope = ?1 AND key = ?2",
            params![self.scope.as_str(), key],
        )?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare("SELECT key FROM kv_store WHERE scope = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.scope.as_str()], |row| row.get(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

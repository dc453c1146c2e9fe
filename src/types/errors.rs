use thiserror::Error;

// === GeneratorError ===

/// Errors related to password generation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    /// The effective character set is empty (every class disabled).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The requested length is outside the supported range.
    #[error("Password length {length} out of range [{min}, {max}]")]
    LengthOutOfRange { length: usize, min: usize, max: usize },
    /// The system random source failed.
    #[error("Random source failed: {0}")]
    RandomSource(String),
}

// === HistoryError ===

/// Errors related to password history operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// History entry with the given ID was not found.
    #[error("History entry not found: {0}")]
    NotFound(String),
}

// === StorageError ===

/// Errors raised by the local key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Storage database error: {0}")]
    DatabaseError(String),
    /// A stored value could not be encoded or decoded.
    #[error("Storage serialization error: {0}")]
    SerializationError(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

// === RemoteError ===

/// Errors from the remote password collection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network, HTTP status, timeout or decode failure.
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
    /// No remote backend has been configured.
    #[error("Remote backend not configured")]
    NotConfigured,
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Unavailable(format!("request timed out: {}", err))
        } else {
            RemoteError::Unavailable(err.to_string())
        }
    }
}

// === SyncError ===

/// Errors related to the remote history sync lifecycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The remote collaborator failed.
    #[error("Sync failed: {0}")]
    Remote(#[from] RemoteError),
    /// Sync requires an active session.
    #[error("Sync requires a signed-in user")]
    NotSignedIn,
}

// === AuthError ===

/// Errors related to authentication and session handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Auth call issued before the minimum interval elapsed. Retryable.
    #[error("Too many auth attempts, retry in {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },
    /// The backend rejected the credentials.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    /// The auth backend could not be reached or answered with an error.
    #[error("Auth backend unavailable: {0}")]
    Unavailable(String),
    /// The action requires a signed-in user.
    #[error("Not signed in")]
    NotSignedIn,
    /// No auth backend has been configured.
    #[error("Auth backend not configured")]
    NotConfigured,
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Unavailable(err.to_string())
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === AppError ===

/// Top-level error returned by the application context.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Storage(StorageError::from(err))
    }
}

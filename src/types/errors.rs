use thiserror::Error;

// === HistoryError ===

/// Errors returned by history store operations.
///
/// Lookups of absent records are not errors; they come back as `None` or as
/// a shorter result list.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The stream reference is not an http(s) URL.
    #[error("Invalid stream item: {0}")]
    InvalidItem(String),
    /// The search query is blank.
    #[error("Invalid search query: {0:?}")]
    InvalidQuery(String),
    /// The playback position is negative.
    #[error("Invalid progress for {url}: {progress_millis} ms")]
    InvalidProgress { url: String, progress_millis: i64 },
    /// Database operation failed.
    #[error("History database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The stream resolver could not produce metadata for a URL.
    #[error("Stream resolution failed: {0}")]
    Resolution(#[from] ResolveError),
    /// The background task running the operation did not finish.
    #[error("History task failed: {0}")]
    Task(String),
}

// === ResolveError ===

/// Errors reported by a `StreamResolver` implementation.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The URL does not belong to any known service.
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),
    /// The upstream service could not be reached.
    #[error("Network error: {0}")]
    Network(String),
    /// The upstream response could not be interpreted.
    #[error("Extraction failed: {0}")]
    Extraction(String),
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

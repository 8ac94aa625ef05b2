use serde::{Deserialize, Serialize};

/// Persisted configuration of the history store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    /// Explicit database file. `None` places `watchlog.db` in the data directory.
    pub database_path: Option<String>,
    /// When off, views are accepted but not written.
    pub watch_history_enabled: bool,
    /// When off, searches are accepted but not written.
    pub search_history_enabled: bool,
    /// Default number of search suggestions handed out over RPC.
    pub suggestion_limit: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            watch_history_enabled: true,
            search_history_enabled: true,
            suggestion_limit: 25,
        }
    }
}

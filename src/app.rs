//! App Core for watchlog.
//!
//! Holds the settings engine and the history store the RPC surface works on.

use std::fs;
use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::services::history_store::HistoryRecordStore;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Central application struct.
pub struct App {
    pub store: HistoryRecordStore,
    settings_engine: Mutex<SettingsEngine>,
}

impl App {
    /// Loads settings from `config_path` (or the platform default) and opens
    /// the database they point at, creating its directory when needed.
    pub fn new(config_path: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings_engine = SettingsEngine::new(config_path);
        let settings = settings_engine.load()?;

        let db_path = settings_engine.database_path();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        info!(db = %db_path.display(), config = %settings_engine.get_config_path(), "opening history store");

        let store = HistoryRecordStore::open(&db_path, settings)?;
        Ok(Self {
            store,
            settings_engine: Mutex::new(settings_engine),
        })
    }

    /// Builds an app around an already opened store, applying the engine's
    /// current settings to it.
    pub fn with_store(settings_engine: SettingsEngine, store: HistoryRecordStore) -> Self {
        store.update_settings(settings_engine.get_settings().clone());
        Self {
            store,
            settings_engine: Mutex::new(settings_engine),
        }
    }

    /// Locks the settings engine. A poisoned lock still yields the engine.
    pub fn settings_engine(&self) -> MutexGuard<'_, SettingsEngine> {
        match self.settings_engine.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// watchlog Settings Engine
// Loads, saves, updates and resets the store settings.
// Settings are stored as a JSON file at the platform-specific config path.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::StoreSettings;

/// Environment variable overriding the directory that holds the database.
pub const DATA_DIR_ENV: &str = "WATCHLOG_DATA_DIR";

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "watchlog.db";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<StoreSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &StoreSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
    fn database_path(&self) -> PathBuf;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: StoreSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            settings: StoreSettings::default(),
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<StoreSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!(path = %self.config_path, "no settings file, using defaults");
            self.settings = StoreSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: StoreSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Updates a single top-level setting and saves to disk.
    ///
    /// The value is validated by deserializing the updated document back into
    /// `StoreSettings`, so type mismatches are rejected without changing state.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        match &mut json_value {
            serde_json::Value::Object(map) => {
                if !map.contains_key(key) {
                    return Err(SettingsError::InvalidKey(format!(
                        "Key '{}' not found in settings",
                        key
                    )));
                }
                map.insert(key.to_string(), value);
            }
            _ => {
                return Err(SettingsError::SerializationError(
                    "Settings did not serialize to an object".to_string(),
                ));
            }
        }

        let new_settings: StoreSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.settings = new_settings;
        self.save()?;
        Ok(())
    }

    /// Resets all settings to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = StoreSettings::default();
        self.save()?;
        Ok(())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }

    /// Where the database lives: the explicit setting, else `$WATCHLOG_DATA_DIR`,
    /// else the platform data directory.
    fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.settings.database_path {
            return PathBuf::from(path);
        }
        match env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join(DATABASE_FILE),
            _ => platform::get_data_dir().join(DATABASE_FILE),
        }
    }
}

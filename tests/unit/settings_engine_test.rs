//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, value persistence, and reset behavior.

use std::fs;

use tempfile::TempDir;
use watchlog::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use watchlog::types::errors::SettingsError;
use watchlog::types::settings::StoreSettings;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("settings.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, StoreSettings::default());
    assert!(settings.watch_history_enabled);
    assert!(settings.search_history_enabled);
    assert_eq!(settings.suggestion_limit, 25);
    assert!(settings.database_path.is_none());
}

/// A change made through one engine is visible to a fresh engine on the same file.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("search_history_enabled", serde_json::Value::Bool(false))
            .unwrap();
        engine.set_value("suggestion_limit", serde_json::json!(10)).unwrap();
    }

    let mut engine = engine_in_temp(&dir);
    let loaded = engine.load().unwrap();
    assert!(!loaded.search_history_enabled);
    assert_eq!(loaded.suggestion_limit, 10);
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    engine
        .set_value("watch_history_enabled", serde_json::Value::Bool(false))
        .unwrap();
    engine.reset().unwrap();
    assert_eq!(*engine.get_settings(), StoreSettings::default());

    let mut reloaded = engine_in_temp(&dir);
    assert_eq!(reloaded.load().unwrap(), StoreSettings::default());
}

#[test]
fn test_invalid_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(matches!(
        engine.set_value("", serde_json::Value::Bool(true)),
        Err(SettingsError::InvalidKey(_))
    ));
    assert!(matches!(
        engine.set_value("theme", serde_json::Value::Bool(true)),
        Err(SettingsError::InvalidKey(_))
    ));
}

#[test]
fn test_malformed_file_is_a_serialization_error() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    fs::write(engine.get_config_path(), "{ invalid json }").unwrap();

    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

/// Missing keys in an older file fall back to their defaults.
#[test]
fn test_partial_file_uses_defaults_for_missing_keys() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    fs::write(engine.get_config_path(), r#"{"watch_history_enabled": false}"#).unwrap();

    let settings = engine.load().unwrap();
    assert!(!settings.watch_history_enabled);
    assert!(settings.search_history_enabled);
    assert_eq!(settings.suggestion_limit, 25);
}

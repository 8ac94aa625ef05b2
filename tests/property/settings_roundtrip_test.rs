//! Property-based tests for settings persistence.
//!
//! These tests verify that any valid `StoreSettings` saved through the
//! settings engine loads back unchanged from a fresh engine.

use proptest::prelude::*;
use tempfile::TempDir;
use watchlog::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use watchlog::types::settings::StoreSettings;

fn arb_settings() -> impl Strategy<Value = StoreSettings> {
    (
        proptest::option::of("/[a-z]{1,10}/[a-z]{1,10}\\.db"),
        any::<bool>(),
        any::<bool>(),
        0usize..500,
    )
        .prop_map(
            |(database_path, watch_history_enabled, search_history_enabled, suggestion_limit)| {
                StoreSettings {
                    database_path,
                    watch_history_enabled,
                    search_history_enabled,
                    suggestion_limit,
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn settings_survive_save_and_load(settings in arb_settings()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        let mut writer = SettingsEngine::new(Some(path.clone()));
        writer.load().unwrap();
        let doc = serde_json::to_value(&settings).unwrap();
        if let serde_json::Value::Object(map) = doc {
            for (key, value) in map {
                writer.set_value(&key, value).unwrap();
            }
        }

        let mut reader = SettingsEngine::new(Some(path));
        let loaded = reader.load().unwrap();
        prop_assert_eq!(loaded, settings);
    }
}

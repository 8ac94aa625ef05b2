//! RPC method handler for the watchlog JSON-RPC protocol.
//!
//! Extracted from `main.rs` so it can be unit-tested independently.
//! `handle_method` dispatches method calls to the history store via the `App`.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::app::App;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::history::{HistorySort, StreamHistoryEntry, StreamItem};

fn field<T: DeserializeOwned>(params: &Value, name: &str) -> Result<T, String> {
    let value = params.get(name).cloned().ok_or(format!("missing {}", name))?;
    serde_json::from_value(value).map_err(|e| format!("invalid {}: {}", name, e))
}

fn optional_field<T: DeserializeOwned>(params: &Value, name: &str) -> Result<Option<T>, String> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => field(params, name).map(Some),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call to the history store.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    let store = &app.store;
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Stream history ───
        "history.view" => {
            let item: StreamItem = field(params, "item")?;
            let uid = store.record_view(&item).await.map_err(|e| e.to_string())?;
            Ok(json!({"stream_id": uid, "recorded": uid.is_some()}))
        }
        "history.list" => {
            let sort = match optional_field::<String>(params, "sort")? {
                Some(s) => HistorySort::parse(&s).ok_or(format!("invalid sort: {}", s))?,
                None => HistorySort::default(),
            };
            let entries = store.stream_history_sorted(sort).await.map_err(|e| e.to_string())?;
            Ok(json!({"items": to_json(&entries)?}))
        }
        "history.delete" => {
            let entries: Vec<StreamHistoryEntry> = field(params, "entries")?;
            let n = store.delete_stream_history(&entries).await.map_err(|e| e.to_string())?;
            Ok(json!({"deleted": n}))
        }
        "history.insert" => {
            let entries: Vec<StreamHistoryEntry> = field(params, "entries")?;
            let n = store.insert_stream_history(&entries).await.map_err(|e| e.to_string())?;
            Ok(json!({"inserted": n}))
        }
        "history.clear" => {
            let n = store.clear_all_stream_history().await.map_err(|e| e.to_string())?;
            Ok(json!({"deleted": n}))
        }
        "history.forget" => {
            let item: StreamItem = field(params, "item")?;
            let n = store
                .delete_stream_history_and_state(&item)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"deleted": n}))
        }

        // ─── Search history ───
        "search.record" => {
            let query: String = field(params, "query")?;
            let service_id: i32 = optional_field(params, "service_id")?.unwrap_or(0);
            let id = store.record_search(service_id, &query).await.map_err(|e| e.to_string())?;
            Ok(json!({"id": id, "recorded": id.is_some()}))
        }
        "search.related" => {
            let default_limit = app.settings_engine().get_settings().suggestion_limit;
            let prefix: String = optional_field(params, "prefix")?.unwrap_or_default();
            let limit: usize = optional_field(params, "limit")?.unwrap_or(default_limit);
            let max_items: usize = optional_field(params, "max_items")?.unwrap_or(limit);
            let entries = store
                .related_searches(&prefix, limit, max_items)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"items": to_json(&entries)?}))
        }
        "search.delete" => {
            let query: String = field(params, "query")?;
            let n = store.delete_search_entry(&query).await.map_err(|e| e.to_string())?;
            Ok(json!({"deleted": n}))
        }
        "search.clear" => {
            let n = store.clear_all_search_history().await.map_err(|e| e.to_string())?;
            Ok(json!({"deleted": n}))
        }

        // ─── Stream state ───
        "state.save" => {
            let item: StreamItem = field(params, "item")?;
            let progress: i64 = field(params, "progress_millis")?;
            store.save_stream_state(&item, progress).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "state.load" => {
            let item: StreamItem = field(params, "item")?;
            let state = store.load_stream_state(&item).await.map_err(|e| e.to_string())?;
            Ok(json!({"found": state.is_some(), "state": to_json(&state)?}))
        }
        "state.load_batch" => {
            let items: Vec<StreamItem> = field(params, "items")?;
            let states = store.load_stream_state_batch(&items).await.map_err(|e| e.to_string())?;
            Ok(json!({"items": to_json(&states)?}))
        }
        "state.delete" => {
            let item: StreamItem = field(params, "item")?;
            let deleted = store.delete_stream_state(&item).await.map_err(|e| e.to_string())?;
            Ok(json!({"deleted": deleted}))
        }
        "state.clear" => {
            let n = store.clear_all_stream_states().await.map_err(|e| e.to_string())?;
            Ok(json!({"deleted": n}))
        }

        // ─── Maintenance ───
        "maintenance.prune" => {
            let n = store.remove_orphaned_streams().await.map_err(|e| e.to_string())?;
            Ok(json!({"removed": n}))
        }

        // ─── Settings ───
        "settings.get" => to_json(app.settings_engine().get_settings()),
        "settings.set" => {
            let key: String = field(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let settings = {
                let mut engine = app.settings_engine();
                engine.set_value(&key, value).map_err(|e| e.to_string())?;
                engine.get_settings().clone()
            };
            store.update_settings(settings);
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}

use serde::{Deserialize, Serialize};

/// A playable media item as handed to the store by callers.
///
/// Only `service_id` and `url` identify the item; the remaining fields are
/// metadata refreshed every time the item is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamItem {
    pub service_id: i32,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub duration_secs: i64,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl StreamItem {
    /// Creates an item with empty metadata.
    pub fn new(service_id: i32, url: impl Into<String>) -> Self {
        Self {
            service_id,
            url: url.into(),
            title: String::new(),
            uploader: String::new(),
            duration_secs: 0,
            thumbnail_url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = uploader.into();
        self
    }

    pub fn with_duration(mut self, duration_secs: i64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    /// An item is usable as a history key when its URL is an http(s) URL.
    pub fn is_valid(&self) -> bool {
        let url = self.url.trim();
        !url.is_empty()
            && url == self.url
            && (url.starts_with("http://") || url.starts_with("https://"))
            && self.duration_secs >= 0
    }
}

/// Persisted identity of a stream, shared by history and state rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub uid: i64,
    pub service_id: i32,
    pub url: String,
    pub title: String,
    pub uploader: String,
    pub duration_secs: i64,
    pub thumbnail_url: Option<String>,
}

impl StreamRecord {
    /// Converts the record back into the caller-facing item shape.
    pub fn to_item(&self) -> StreamItem {
        StreamItem {
            service_id: self.service_id,
            url: self.url.clone(),
            title: self.title.clone(),
            uploader: self.uploader.clone(),
            duration_secs: self.duration_secs,
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

/// One row of the watch history: a stream with how often and when it was last viewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHistoryEntry {
    pub stream: StreamRecord,
    /// Milliseconds since the UNIX epoch of the most recent view.
    pub access_date: i64,
    pub repeat_count: i64,
}

/// A single issued search. Identical query texts are kept as separate events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub id: i64,
    pub service_id: i32,
    pub search: String,
    /// Milliseconds since the UNIX epoch.
    pub creation_date: i64,
}

/// Saved playback position of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStateEntry {
    pub stream_id: i64,
    pub url: String,
    pub progress_millis: i64,
}

/// Metadata returned by a stream resolver for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub item: StreamItem,
    #[serde(default)]
    pub related: Vec<StreamItem>,
}

/// Orderings offered for the watch history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HistorySort {
    /// Most recently viewed first.
    #[default]
    LastPlayed,
    /// Highest repeat count first.
    MostPlayed,
}

impl HistorySort {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "last_played" => Some(HistorySort::LastPlayed),
            "most_played" => Some(HistorySort::MostPlayed),
            _ => None,
        }
    }
}

/// Stable re-sort of an already materialized history collection.
///
/// Entries comparing equal keep their relative position.
pub fn sort_stream_history(entries: &mut [StreamHistoryEntry], order: HistorySort) {
    match order {
        HistorySort::LastPlayed => entries.sort_by(|a, b| b.access_date.cmp(&a.access_date)),
        HistorySort::MostPlayed => entries.sort_by(|a, b| b.repeat_count.cmp(&a.repeat_count)),
    }
}

//! History Record Manager for watchlog.
//!
//! Implements `HistoryRecordManagerTrait`: recording stream views, searches and
//! playback positions, listing and pruning them, backed by SQLite via `rusqlite`.
//!
//! Every operation that touches more than one row runs inside a single
//! transaction, so bulk calls either apply completely or not at all.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::types::errors::HistoryError;
use crate::types::history::{
    sort_stream_history, HistorySort, SearchHistoryEntry, StreamHistoryEntry, StreamItem,
    StreamRecord, StreamStateEntry,
};
use crate::types::settings::StoreSettings;

const STREAM_HISTORY_SELECT: &str = "SELECT s.uid, s.service_id, s.url, s.title, s.uploader, \
     s.duration, s.thumbnail_url, h.access_date, h.repeat_count \
     FROM stream_history h JOIN streams s ON s.uid = h.stream_id";

const STREAM_STATE_BY_ITEM: &str = "SELECT st.stream_id, s.url, st.progress_millis \
     FROM stream_state st JOIN streams s ON s.uid = st.stream_id \
     WHERE s.service_id = ?1 AND s.url = ?2";

/// Trait defining history record operations.
pub trait HistoryRecordManagerTrait {
    // Stream history
    fn record_view(&mut self, item: &StreamItem) -> Result<Option<i64>, HistoryError>;
    fn stream_history(&self) -> Result<Vec<StreamHistoryEntry>, HistoryError>;
    fn stream_history_sorted(&self, order: HistorySort) -> Result<Vec<StreamHistoryEntry>, HistoryError>;
    fn delete_stream_history(&mut self, entries: &[StreamHistoryEntry]) -> Result<usize, HistoryError>;
    fn insert_stream_history(&mut self, entries: &[StreamHistoryEntry]) -> Result<usize, HistoryError>;
    fn clear_all_stream_history(&mut self) -> Result<usize, HistoryError>;
    fn delete_stream_history_and_state(&mut self, item: &StreamItem) -> Result<usize, HistoryError>;

    // Search history
    fn record_search(&mut self, service_id: i32, query: &str) -> Result<Option<i64>, HistoryError>;
    fn related_searches(
        &self,
        prefix: &str,
        limit: usize,
        max_items: usize,
    ) -> Result<Vec<SearchHistoryEntry>, HistoryError>;
    fn search_history(&self) -> Result<Vec<SearchHistoryEntry>, HistoryError>;
    fn delete_search_entry(&mut self, query: &str) -> Result<usize, HistoryError>;
    fn clear_all_search_history(&mut self) -> Result<usize, HistoryError>;

    // Stream state
    fn save_stream_state(&mut self, item: &StreamItem, progress_millis: i64) -> Result<(), HistoryError>;
    fn load_stream_state(&self, item: &StreamItem) -> Result<Option<StreamStateEntry>, HistoryError>;
    fn load_stream_state_batch(&self, items: &[StreamItem]) -> Result<Vec<StreamStateEntry>, HistoryError>;
    fn delete_stream_state(&mut self, item: &StreamItem) -> Result<bool, HistoryError>;
    fn clear_all_stream_states(&mut self) -> Result<usize, HistoryError>;

    // Maintenance
    fn remove_orphaned_streams(&mut self) -> Result<usize, HistoryError>;

    fn is_watch_history_enabled(&self) -> bool;
    fn set_watch_history_enabled(&mut self, enabled: bool);
    fn is_search_history_enabled(&self) -> bool;
    fn set_search_history_enabled(&mut self, enabled: bool);
}

/// History record manager backed by a SQLite connection.
pub struct HistoryRecordManager<'a> {
    conn: &'a Connection,
    clock: &'a dyn Clock,
    watch_history_enabled: bool,
    search_history_enabled: bool,
}

impl<'a> HistoryRecordManager<'a> {
    /// Creates a manager with both watch and search recording enabled.
    pub fn new(conn: &'a Connection, clock: &'a dyn Clock) -> Self {
        Self {
            conn,
            clock,
            watch_history_enabled: true,
            search_history_enabled: true,
        }
    }

    /// Creates a manager whose recording switches follow `settings`.
    pub fn with_settings(conn: &'a Connection, clock: &'a dyn Clock, settings: &StoreSettings) -> Self {
        Self {
            conn,
            clock,
            watch_history_enabled: settings.watch_history_enabled,
            search_history_enabled: settings.search_history_enabled,
        }
    }

    fn ensure_valid(item: &StreamItem) -> Result<(), HistoryError> {
        if item.is_valid() {
            Ok(())
        } else {
            warn!(url = %item.url, "rejected malformed stream item");
            Err(HistoryError::InvalidItem(item.url.clone()))
        }
    }

    /// Inserts the stream or refreshes its non-empty metadata, returning its uid.
    fn upsert_stream(conn: &Connection, item: &StreamItem) -> Result<i64, HistoryError> {
        conn.execute(
            "INSERT INTO streams (service_id, url, title, uploader, duration, thumbnail_url) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(service_id, url) DO UPDATE SET \
                 title = CASE WHEN excluded.title = '' THEN streams.title ELSE excluded.title END, \
                 uploader = CASE WHEN excluded.uploader = '' THEN streams.uploader ELSE excluded.uploader END, \
                 duration = CASE WHEN excluded.duration = 0 THEN streams.duration ELSE excluded.duration END, \
                 thumbnail_url = COALESCE(excluded.thumbnail_url, streams.thumbnail_url)",
            params![
                item.service_id,
                item.url,
                item.title,
                item.uploader,
                item.duration_secs,
                item.thumbnail_url
            ],
        )?;
        Self::find_stream_uid(conn, item.service_id, &item.url)?
            .ok_or_else(|| HistoryError::InvalidItem(item.url.clone()))
    }

    fn find_stream_uid(conn: &Connection, service_id: i32, url: &str) -> Result<Option<i64>, HistoryError> {
        let uid = conn
            .query_row(
                "SELECT uid FROM streams WHERE service_id = ?1 AND url = ?2",
                params![service_id, url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(uid)
    }

    /// Re-creates the stream row of a captured entry, keeping its uid when it is still free.
    fn restore_stream(conn: &Connection, stream: &StreamRecord) -> Result<i64, HistoryError> {
        conn.execute(
            "INSERT OR IGNORE INTO streams (uid, service_id, url, title, uploader, duration, thumbnail_url) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stream.uid,
                stream.service_id,
                stream.url,
                stream.title,
                stream.uploader,
                stream.duration_secs,
                stream.thumbnail_url
            ],
        )?;
        match Self::find_stream_uid(conn, stream.service_id, &stream.url)? {
            Some(uid) => Ok(uid),
            None => Self::upsert_stream(conn, &stream.to_item()),
        }
    }

    /// Reads a joined stream/history row into a struct.
    fn row_to_history_entry(row: &rusqlite::Row) -> rusqlite::Result<StreamHistoryEntry> {
        Ok(StreamHistoryEntry {
            stream: StreamRecord {
                uid: row.get(0)?,
                service_id: row.get(1)?,
                url: row.get(2)?,
                title: row.get(3)?,
                uploader: row.get(4)?,
                duration_secs: row.get(5)?,
                thumbnail_url: row.get(6)?,
            },
            access_date: row.get(7)?,
            repeat_count: row.get(8)?,
        })
    }

    fn row_to_search_entry(row: &rusqlite::Row) -> rusqlite::Result<SearchHistoryEntry> {
        Ok(SearchHistoryEntry {
            id: row.get(0)?,
            service_id: row.get(1)?,
            search: row.get(2)?,
            creation_date: row.get(3)?,
        })
    }

    fn row_to_state_entry(row: &rusqlite::Row) -> rusqlite::Result<StreamStateEntry> {
        Ok(StreamStateEntry {
            stream_id: row.get(0)?,
            url: row.get(1)?,
            progress_millis: row.get(2)?,
        })
    }

    /// Escapes LIKE wildcards so the prefix matches literally.
    fn like_prefix(prefix: &str) -> String {
        let mut pattern = String::with_capacity(prefix.len() + 1);
        for c in prefix.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    fn query_searches(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<SearchHistoryEntry>, HistoryError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_search_entry)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

impl<'a> HistoryRecordManagerTrait for HistoryRecordManager<'a> {
    /// Records a view of `item`. A first view inserts an entry with count 1;
    /// later views increment the count and move the access date to now.
    /// Returns the stream uid, or `None` when watch history is disabled.
    fn record_view(&mut self, item: &StreamItem) -> Result<Option<i64>, HistoryError> {
        Self::ensure_valid(item)?;
        if !self.watch_history_enabled {
            debug!(url = %item.url, "watch history disabled, view not recorded");
            return Ok(None);
        }

        let now = self.clock.now_millis();
        let tx = self.conn.unchecked_transaction()?;
        let uid = Self::upsert_stream(&tx, item)?;
        tx.execute(
            "INSERT INTO stream_history (stream_id, access_date, repeat_count) VALUES (?1, ?2, 1) \
             ON CONFLICT(stream_id) DO UPDATE SET \
                 repeat_count = repeat_count + 1, access_date = excluded.access_date",
            params![uid, now],
        )?;
        tx.commit()?;

        debug!(uid, url = %item.url, access_date = now, "recorded view");
        Ok(Some(uid))
    }

    /// Lists the watch history, most recently viewed first.
    fn stream_history(&self) -> Result<Vec<StreamHistoryEntry>, HistoryError> {
        let sql = format!("{} ORDER BY h.access_date DESC, h.stream_id DESC", STREAM_HISTORY_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_history_entry)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn stream_history_sorted(&self, order: HistorySort) -> Result<Vec<StreamHistoryEntry>, HistoryError> {
        let mut entries = self.stream_history()?;
        sort_stream_history(&mut entries, order);
        Ok(entries)
    }

    /// Deletes exactly the given entries, matched by `(service_id, url)`.
    /// Entries already gone are skipped; a stale `uid` is ignored.
    fn delete_stream_history(&mut self, entries: &[StreamHistoryEntry]) -> Result<usize, HistoryError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut affected = 0;
        {
            let mut stmt = tx.prepare(
                "DELETE FROM stream_history WHERE stream_id = \
                 (SELECT uid FROM streams WHERE service_id = ?1 AND url = ?2)",
            )?;
            for entry in entries {
                affected += stmt.execute(params![entry.stream.service_id, entry.stream.url])?;
            }
        }
        tx.commit()?;

        debug!(requested = entries.len(), affected, "deleted stream history entries");
        Ok(affected)
    }

    /// Re-inserts captured entries with their original counts and access dates.
    fn insert_stream_history(&mut self, entries: &[StreamHistoryEntry]) -> Result<usize, HistoryError> {
        for entry in entries {
            Self::ensure_valid(&entry.stream.to_item())?;
            if entry.repeat_count < 1 {
                warn!(url = %entry.stream.url, repeat_count = entry.repeat_count, "rejected history entry");
                return Err(HistoryError::InvalidItem(entry.stream.url.clone()));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut affected = 0;
        for entry in entries {
            let uid = Self::restore_stream(&tx, &entry.stream)?;
            affected += tx.execute(
                "INSERT INTO stream_history (stream_id, access_date, repeat_count) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(stream_id) DO UPDATE SET \
                     access_date = excluded.access_date, repeat_count = excluded.repeat_count",
                params![uid, entry.access_date, entry.repeat_count],
            )?;
        }
        tx.commit()?;

        debug!(affected, "inserted stream history entries");
        Ok(affected)
    }

    fn clear_all_stream_history(&mut self) -> Result<usize, HistoryError> {
        let affected = self.conn.execute("DELETE FROM stream_history", [])?;
        debug!(affected, "cleared stream history");
        Ok(affected)
    }

    /// Removes both the history entry and the saved position of one stream.
    fn delete_stream_history_and_state(&mut self, item: &StreamItem) -> Result<usize, HistoryError> {
        Self::ensure_valid(item)?;
        let Some(uid) = Self::find_stream_uid(self.conn, item.service_id, &item.url)? else {
            return Ok(0);
        };

        let tx = self.conn.unchecked_transaction()?;
        let mut affected = tx.execute("DELETE FROM stream_history WHERE stream_id = ?1", params![uid])?;
        affected += tx.execute("DELETE FROM stream_state WHERE stream_id = ?1", params![uid])?;
        tx.commit()?;
        Ok(affected)
    }

    /// Appends a search to the log. Returns the new entry id, or `None`
    /// when search history is disabled.
    fn record_search(&mut self, service_id: i32, query: &str) -> Result<Option<i64>, HistoryError> {
        if query.trim().is_empty() {
            warn!("rejected blank search query");
            return Err(HistoryError::InvalidQuery(query.to_string()));
        }
        if !self.search_history_enabled {
            debug!("search history disabled, search not recorded");
            return Ok(None);
        }

        let now = self.clock.now_millis();
        self.conn.execute(
            "INSERT INTO search_history (creation_date, service_id, search) VALUES (?1, ?2, ?3)",
            params![now, service_id, query],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, service_id, "recorded search");
        Ok(Some(id))
    }

    /// Suggests previous queries, one per distinct text, newest first.
    /// Recency is insertion order (`id`), so a clock stepping back cannot
    /// reorder suggestions.
    ///
    /// An empty prefix yields the latest `max_items` queries; otherwise up to
    /// `limit` queries starting with `prefix` (ASCII case-insensitive).
    fn related_searches(
        &self,
        prefix: &str,
        limit: usize,
        max_items: usize,
    ) -> Result<Vec<SearchHistoryEntry>, HistoryError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            self.query_searches(
                "SELECT id, service_id, search, creation_date FROM search_history \
                 WHERE id IN (SELECT MAX(id) FROM search_history GROUP BY search) \
                 ORDER BY id DESC LIMIT ?1",
                params![max_items as i64],
            )
        } else {
            self.query_searches(
                "SELECT id, service_id, search, creation_date FROM search_history \
                 WHERE id IN (SELECT MAX(id) FROM search_history \
                              WHERE search LIKE ?1 ESCAPE '\\' GROUP BY search) \
                 ORDER BY id DESC LIMIT ?2",
                params![Self::like_prefix(prefix), limit as i64],
            )
        }
    }

    fn search_history(&self) -> Result<Vec<SearchHistoryEntry>, HistoryError> {
        self.query_searches(
            "SELECT id, service_id, search, creation_date FROM search_history \
             ORDER BY id DESC",
            [],
        )
    }

    /// Deletes every log entry whose text equals `query` exactly.
    fn delete_search_entry(&mut self, query: &str) -> Result<usize, HistoryError> {
        let affected = self
            .conn
            .execute("DELETE FROM search_history WHERE search = ?1", params![query])?;
        debug!(affected, "deleted search entries");
        Ok(affected)
    }

    fn clear_all_search_history(&mut self) -> Result<usize, HistoryError> {
        let affected = self.conn.execute("DELETE FROM search_history", [])?;
        debug!(affected, "cleared search history");
        Ok(affected)
    }

    /// Stores the playback position of `item`, replacing any earlier one.
    fn save_stream_state(&mut self, item: &StreamItem, progress_millis: i64) -> Result<(), HistoryError> {
        Self::ensure_valid(item)?;
        if progress_millis < 0 {
            warn!(url = %item.url, progress_millis, "rejected negative progress");
            return Err(HistoryError::InvalidProgress {
                url: item.url.clone(),
                progress_millis,
            });
        }

        let tx = self.conn.unchecked_transaction()?;
        let uid = Self::upsert_stream(&tx, item)?;
        tx.execute(
            "INSERT INTO stream_state (stream_id, progress_millis) VALUES (?1, ?2) \
             ON CONFLICT(stream_id) DO UPDATE SET progress_millis = excluded.progress_millis",
            params![uid, progress_millis],
        )?;
        tx.commit()?;

        debug!(uid, progress_millis, "saved stream state");
        Ok(())
    }

    fn load_stream_state(&self, item: &StreamItem) -> Result<Option<StreamStateEntry>, HistoryError> {
        Self::ensure_valid(item)?;
        let state = self
            .conn
            .query_row(
                STREAM_STATE_BY_ITEM,
                params![item.service_id, item.url],
                Self::row_to_state_entry,
            )
            .optional()?;
        Ok(state)
    }

    /// Loads the saved positions of the items that have one, in input order.
    fn load_stream_state_batch(&self, items: &[StreamItem]) -> Result<Vec<StreamStateEntry>, HistoryError> {
        for item in items {
            Self::ensure_valid(item)?;
        }

        let mut stmt = self.conn.prepare_cached(STREAM_STATE_BY_ITEM)?;
        let mut results = Vec::new();
        for item in items {
            if let Some(state) = stmt
                .query_row(params![item.service_id, item.url], Self::row_to_state_entry)
                .optional()?
            {
                results.push(state);
            }
        }
        Ok(results)
    }

    fn delete_stream_state(&mut self, item: &StreamItem) -> Result<bool, HistoryError> {
        Self::ensure_valid(item)?;
        let affected = self.conn.execute(
            "DELETE FROM stream_state WHERE stream_id = \
             (SELECT uid FROM streams WHERE service_id = ?1 AND url = ?2)",
            params![item.service_id, item.url],
        )?;
        Ok(affected > 0)
    }

    fn clear_all_stream_states(&mut self) -> Result<usize, HistoryError> {
        let affected = self.conn.execute("DELETE FROM stream_state", [])?;
        debug!(affected, "cleared stream states");
        Ok(affected)
    }

    /// Deletes stream rows referenced by neither history nor saved state.
    fn remove_orphaned_streams(&mut self) -> Result<usize, HistoryError> {
        let affected = self.conn.execute(
            "DELETE FROM streams \
             WHERE uid NOT IN (SELECT stream_id FROM stream_history) \
               AND uid NOT IN (SELECT stream_id FROM stream_state)",
            [],
        )?;
        debug!(affected, "removed orphaned streams");
        Ok(affected)
    }

    fn is_watch_history_enabled(&self) -> bool {
        self.watch_history_enabled
    }

    fn set_watch_history_enabled(&mut self, enabled: bool) {
        self.watch_history_enabled = enabled;
    }

    fn is_search_history_enabled(&self) -> bool {
        self.search_history_enabled
    }

    fn set_search_history_enabled(&mut self, enabled: bool) {
        self.search_history_enabled = enabled;
    }
}

//! Asynchronous history record store.
//!
//! [`HistoryRecordStore`] owns the database behind a single mutex and runs every
//! operation on tokio's blocking pool, so writes to the same stream are
//! serialized and each view increment is applied exactly once. The future
//! returned by an operation is its completion handle: once it resolves, any
//! read started afterwards observes the change. Dropping the future does not
//! cancel a write that has already been handed to the blocking pool.
//!
//! Observers subscribe through [`LiveQuery`]. After each committed mutation the
//! store bumps a version counter on a `tokio::sync::watch` channel; observers
//! wake up and pull the current materialized collection.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::database::Database;
use crate::managers::history_manager::{HistoryRecordManager, HistoryRecordManagerTrait};
use crate::services::resolver::StreamResolver;
use crate::types::errors::HistoryError;
use crate::types::history::{
    HistorySort, SearchHistoryEntry, StreamHistoryEntry, StreamItem, StreamStateEntry,
};
use crate::types::settings::StoreSettings;

type Query<T> = Arc<dyn Fn(&HistoryRecordManager<'_>) -> Result<T, HistoryError> + Send + Sync>;

fn query<T, F>(f: F) -> Query<T>
where
    F: Fn(&HistoryRecordManager<'_>) -> Result<T, HistoryError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Collections whose observers are notified on change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    StreamHistory,
    SearchHistory,
}

struct StoreInner {
    db: Mutex<Database>,
    clock: Arc<dyn Clock>,
    settings: RwLock<StoreSettings>,
    stream_version: watch::Sender<u64>,
    search_version: watch::Sender<u64>,
}

impl StoreInner {
    fn notify(&self, topic: Topic) {
        let sender = match topic {
            Topic::StreamHistory => &self.stream_version,
            Topic::SearchHistory => &self.search_version,
        };
        sender.send_modify(|version| *version += 1);
    }

    fn settings(&self) -> StoreSettings {
        match self.settings.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Cheaply clonable handle to the history store.
#[derive(Clone)]
pub struct HistoryRecordStore {
    inner: Arc<StoreInner>,
}

impl HistoryRecordStore {
    /// Wraps an opened database.
    pub fn new(db: Database, clock: Arc<dyn Clock>, settings: StoreSettings) -> Self {
        let (stream_version, _) = watch::channel(0);
        let (search_version, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                db: Mutex::new(db),
                clock,
                settings: RwLock::new(settings),
                stream_version,
                search_version,
            }),
        }
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, settings: StoreSettings) -> Result<Self, HistoryError> {
        let db = Database::open(path)?;
        Ok(Self::new(db, Arc::new(SystemClock::new()), settings))
    }

    /// Opens a store on a private in-memory database with default settings.
    pub fn open_in_memory() -> Result<Self, HistoryError> {
        let db = Database::open_in_memory()?;
        Ok(Self::new(db, Arc::new(SystemClock::new()), StoreSettings::default()))
    }

    pub fn settings(&self) -> StoreSettings {
        self.inner.settings()
    }

    /// Replaces the settings used by subsequent operations.
    pub fn update_settings(&self, settings: StoreSettings) {
        match self.inner.settings.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }

    /// Runs `op` against the database on the blocking pool.
    async fn run<T, F>(&self, topic: Option<Topic>, op: F) -> Result<T, HistoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut HistoryRecordManager<'_>) -> Result<T, HistoryError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || -> Result<T, HistoryError> {
            let settings = inner.settings();
            let db = match inner.db.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let mut manager =
                HistoryRecordManager::with_settings(db.connection(), inner.clock.as_ref(), &settings);
            let result = op(&mut manager)?;
            drop(db);
            if let Some(topic) = topic {
                inner.notify(topic);
            }
            Ok(result)
        })
        .await
        .map_err(|e| HistoryError::Task(e.to_string()))?
    }

    // ─── Stream history ───

    pub async fn record_view(&self, item: &StreamItem) -> Result<Option<i64>, HistoryError> {
        let item = item.clone();
        self.run(Some(Topic::StreamHistory), move |m| m.record_view(&item))
            .await
    }

    /// Resolves `url` and records a view of the resolved stream.
    ///
    /// Resolution failures are returned without touching the store.
    pub async fn record_view_of(
        &self,
        resolver: &dyn StreamResolver,
        url: &str,
    ) -> Result<Option<i64>, HistoryError> {
        let info = resolver.resolve(url).await.map_err(|e| {
            warn!(url, error = %e, "stream resolution failed");
            HistoryError::from(e)
        })?;
        self.record_view(&info.item).await
    }

    pub async fn stream_history(&self) -> Result<Vec<StreamHistoryEntry>, HistoryError> {
        self.run(None, |m| m.stream_history()).await
    }

    pub async fn stream_history_sorted(
        &self,
        order: HistorySort,
    ) -> Result<Vec<StreamHistoryEntry>, HistoryError> {
        self.run(None, move |m| m.stream_history_sorted(order)).await
    }

    pub async fn delete_stream_history(
        &self,
        entries: &[StreamHistoryEntry],
    ) -> Result<usize, HistoryError> {
        let entries = entries.to_vec();
        self.run(Some(Topic::StreamHistory), move |m| m.delete_stream_history(&entries))
            .await
    }

    pub async fn insert_stream_history(
        &self,
        entries: &[StreamHistoryEntry],
    ) -> Result<usize, HistoryError> {
        let entries = entries.to_vec();
        self.run(Some(Topic::StreamHistory), move |m| m.insert_stream_history(&entries))
            .await
    }

    pub async fn clear_all_stream_history(&self) -> Result<usize, HistoryError> {
        self.run(Some(Topic::StreamHistory), |m| m.clear_all_stream_history())
            .await
    }

    pub async fn delete_stream_history_and_state(&self, item: &StreamItem) -> Result<usize, HistoryError> {
        let item = item.clone();
        self.run(Some(Topic::StreamHistory), move |m| {
            m.delete_stream_history_and_state(&item)
        })
        .await
    }

    /// Subscribes to the watch history, most recently viewed first.
    pub fn observe_stream_history(&self) -> LiveQuery<Vec<StreamHistoryEntry>> {
        LiveQuery {
            store: self.clone(),
            rx: self.inner.stream_version.subscribe(),
            query: query(|m| m.stream_history()),
        }
    }

    // ─── Search history ───

    pub async fn record_search(&self, service_id: i32, query: &str) -> Result<Option<i64>, HistoryError> {
        let query = query.to_string();
        self.run(Some(Topic::SearchHistory), move |m| m.record_search(service_id, &query))
            .await
    }

    pub async fn related_searches(
        &self,
        prefix: &str,
        limit: usize,
        max_items: usize,
    ) -> Result<Vec<SearchHistoryEntry>, HistoryError> {
        let prefix = prefix.to_string();
        self.run(None, move |m| m.related_searches(&prefix, limit, max_items))
            .await
    }

    pub async fn search_history(&self) -> Result<Vec<SearchHistoryEntry>, HistoryError> {
        self.run(None, |m| m.search_history()).await
    }

    pub async fn delete_search_entry(&self, query: &str) -> Result<usize, HistoryError> {
        let query = query.to_string();
        self.run(Some(Topic::SearchHistory), move |m| m.delete_search_entry(&query))
            .await
    }

    pub async fn clear_all_search_history(&self) -> Result<usize, HistoryError> {
        self.run(Some(Topic::SearchHistory), |m| m.clear_all_search_history())
            .await
    }

    /// Subscribes to search suggestions for `prefix`.
    pub fn observe_related_searches(
        &self,
        prefix: &str,
        limit: usize,
        max_items: usize,
    ) -> LiveQuery<Vec<SearchHistoryEntry>> {
        let prefix = prefix.to_string();
        LiveQuery {
            store: self.clone(),
            rx: self.inner.search_version.subscribe(),
            query: query(move |m| m.related_searches(&prefix, limit, max_items)),
        }
    }

    // ─── Stream state ───

    pub async fn save_stream_state(&self, item: &StreamItem, progress_millis: i64) -> Result<(), HistoryError> {
        let item = item.clone();
        self.run(None, move |m| m.save_stream_state(&item, progress_millis))
            .await
    }

    pub async fn load_stream_state(&self, item: &StreamItem) -> Result<Option<StreamStateEntry>, HistoryError> {
        let item = item.clone();
        self.run(None, move |m| m.load_stream_state(&item)).await
    }

    pub async fn load_stream_state_batch(
        &self,
        items: &[StreamItem],
    ) -> Result<Vec<StreamStateEntry>, HistoryError> {
        let items = items.to_vec();
        self.run(None, move |m| m.load_stream_state_batch(&items)).await
    }

    pub async fn delete_stream_state(&self, item: &StreamItem) -> Result<bool, HistoryError> {
        let item = item.clone();
        self.run(None, move |m| m.delete_stream_state(&item)).await
    }

    pub async fn clear_all_stream_states(&self) -> Result<usize, HistoryError> {
        self.run(None, |m| m.clear_all_stream_states()).await
    }

    // ─── Maintenance ───

    pub async fn remove_orphaned_streams(&self) -> Result<usize, HistoryError> {
        let removed = self.run(None, |m| m.remove_orphaned_streams()).await?;
        debug!(removed, "pruned stream records");
        Ok(removed)
    }
}

/// A continuously updated view over one store query.
///
/// `current` pulls the collection as of now; `changed` waits for the next
/// committed mutation of the underlying collection and then pulls.
pub struct LiveQuery<T> {
    store: HistoryRecordStore,
    rx: watch::Receiver<u64>,
    query: Query<T>,
}

impl<T: Send + 'static> LiveQuery<T> {
    pub async fn current(&mut self) -> Result<T, HistoryError> {
        self.rx.borrow_and_update();
        let query = Arc::clone(&self.query);
        self.store.run(None, move |m| query(&*m)).await
    }

    pub async fn changed(&mut self) -> Result<T, HistoryError> {
        self.rx
            .changed()
            .await
            .map_err(|_| HistoryError::Task("history store closed".to_string()))?;
        self.current().await
    }

    /// Whether a mutation was committed since the last pull.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

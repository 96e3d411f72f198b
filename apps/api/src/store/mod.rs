//! Persistence core: Record Store + two-tier cache + access predictor.
//!
//! A single `Store` is built at startup and shared (`Arc<Store>`) by every
//! entity manager and background task. Reads go exact cache → predictive
//! cache → disk; writes go disk → exact cache → index.

pub mod backup;
pub mod cache;
pub mod counters;
pub mod index;
pub mod locks;
pub mod predictor;
pub mod records;

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

pub use backup::BackupReport;
pub use cache::{CacheTier, TieredCache};
pub use counters::{Counter, CounterSnapshot, Counters};
pub use index::{Index, INDEX_FILE};
pub use locks::KeyedLocks;
pub use predictor::{AccessTracker, Prediction};
pub use records::{EntityKind, RecordStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("corrupt record at {}: {source}", .path.display())]
    CorruptRecord {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("I/O failure at {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("filesystem call timed out at {}", .path.display())]
    Timeout { path: PathBuf },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub cache_capacity: u64,
    pub fs_timeout: Duration,
    /// Access history older than this is dropped by `cleanup`.
    pub access_retention: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/db"),
            backup_dir: PathBuf::from("./data/backups"),
            cache_capacity: 10_000,
            fs_timeout: Duration::from_secs(5),
            access_retention: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub forgotten_keys: usize,
    pub pruned_locks: usize,
}

pub struct Store {
    records: RecordStore,
    cache: TieredCache,
    tracker: Mutex<AccessTracker>,
    index: Mutex<Index>,
    locks: KeyedLocks,
    counters: Counters,
    config: StoreConfig,
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl Store {
    /// Creates the directory layout and loads the index snapshot, rebuilding
    /// it from the directory listing when the snapshot is missing or corrupt.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let records = RecordStore::open(&config.data_dir, config.fs_timeout).await?;
        let index_path = records.base_dir().join(INDEX_FILE);

        let index = match records.read_json_at::<Index>(&index_path).await {
            Ok(Some(index)) => index,
            Ok(None) => rebuild_index(&records).await?,
            Err(e @ StoreError::CorruptRecord { .. }) => {
                warn!("Index snapshot unreadable, rebuilding: {e}");
                rebuild_index(&records).await?
            }
            Err(e) => return Err(e),
        };

        info!(
            "Store opened at {} ({} users, {} tickets indexed)",
            records.base_dir().display(),
            index.len(EntityKind::Users),
            index.len(EntityKind::Tickets)
        );

        Ok(Self {
            cache: TieredCache::new(config.cache_capacity),
            records,
            tracker: Mutex::new(AccessTracker::default()),
            index: Mutex::new(index),
            locks: KeyedLocks::default(),
            counters: Counters::default(),
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Reads through exact cache → predictive cache → disk. Reads that find
    /// a record are recorded as an access for the predictor.
    ///
    /// A disk read only fills the cache when no entry appeared meanwhile, so
    /// a `put` racing with this read keeps its value cached.
    pub async fn get<T: DeserializeOwned>(&self, kind: EntityKind, id: &str) -> StoreResult<Option<T>> {
        let key = kind.cache_key(id);

        if let Some((value, tier)) = self.cache.lookup(&key) {
            debug!("Cache hit ({tier:?}) for {key}");
            self.record_access(&key);
            return self.decode(kind, id, value).map(Some);
        }

        let Some(value) = self.records.read::<Value>(kind, id).await? else {
            return Ok(None);
        };
        let entity = self.decode(kind, id, value.clone())?;
        self.cache.fill(key.clone(), value);
        self.record_access(&key);
        Ok(Some(entity))
    }

    pub async fn put<T: Serialize>(&self, kind: EntityKind, id: &str, entity: &T) -> StoreResult<()> {
        let value = serde_json::to_value(entity)?;
        self.records.write(kind, id, &value).await?;
        self.cache.insert(kind.cache_key(id), value);
        self.with_index(|index| index.touch(kind, id, now_ms()));
        Ok(())
    }

    /// Returns `true` if a record was removed.
    pub async fn remove(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        let removed = self.records.remove(kind, id).await?;
        self.cache.invalidate(&kind.cache_key(id));
        self.with_index(|index| index.forget(kind, id));
        Ok(removed)
    }

    /// Reads every record of `kind` from disk, bypassing the cache.
    /// Corrupt records are skipped with a warning.
    pub async fn scan<T: DeserializeOwned>(&self, kind: EntityKind) -> StoreResult<Vec<T>> {
        self.scan_prefix(kind, "").await
    }

    pub async fn scan_prefix<T: DeserializeOwned>(&self, kind: EntityKind, prefix: &str) -> StoreResult<Vec<T>> {
        let ids = self.records.list(kind).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids.iter().filter(|id| id.starts_with(prefix)) {
            match self.records.read::<T>(kind, id).await {
                Ok(Some(entity)) => out.push(entity),
                Ok(None) => {}
                Err(e @ StoreError::CorruptRecord { .. }) => warn!("Skipping record: {e}"),
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Per-entity lock for read-modify-write sequences.
    pub async fn lock(&self, kind: EntityKind, id: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(&kind.cache_key(id)).await
    }

    pub fn record_access(&self, key: &str) {
        self.with_tracker(|tracker| tracker.record_access(key, now_ms()));
    }

    pub fn prediction(&self, kind: EntityKind, id: &str) -> Option<Prediction> {
        let key = kind.cache_key(id);
        self.with_tracker(|tracker| tracker.prediction(&key))
    }

    pub fn refresh_predictions(&self) -> usize {
        self.with_tracker(AccessTracker::refresh_predictions)
    }

    /// Loads imminent, confident predictions into the predictive cache.
    /// Advisory: load failures are logged and skipped.
    pub async fn prefetch(&self) -> usize {
        let candidates = self.with_tracker(|tracker| tracker.prefetch_candidates(now_ms()));
        let mut loaded = 0;
        for key in candidates {
            if self.cache.contains(&key) {
                continue;
            }
            let Some((kind, id)) = EntityKind::parse_cache_key(&key) else {
                continue;
            };
            match self.records.read::<Value>(kind, id).await {
                Ok(Some(value)) => {
                    self.cache.insert_predicted(key, value);
                    loaded += 1;
                }
                Ok(None) => {}
                Err(e) => debug!("Prefetch of {key} failed: {e}"),
            }
        }
        loaded
    }

    /// Drops idle access history, clears the predictive tier, prunes idle
    /// locks and persists the index snapshot.
    pub async fn cleanup(&self) -> StoreResult<CleanupReport> {
        let cutoff = now_ms() - self.config.access_retention.as_millis() as i64;
        let forgotten_keys = self.with_tracker(|tracker| tracker.forget_idle(cutoff));
        self.cache.clear_predictive();
        let pruned_locks = self.locks.prune();
        self.persist_index().await?;
        Ok(CleanupReport {
            forgotten_keys,
            pruned_locks,
        })
    }

    pub fn index_snapshot(&self) -> Index {
        self.with_index(|index| index.clone())
    }

    pub async fn persist_index(&self) -> StoreResult<()> {
        let snapshot = self.index_snapshot();
        let path = self.records.base_dir().join(INDEX_FILE);
        self.records.write_json_at(&path, &snapshot).await
    }

    fn decode<T: DeserializeOwned>(&self, kind: EntityKind, id: &str, value: Value) -> StoreResult<T> {
        serde_json::from_value(value).map_err(|source| StoreError::CorruptRecord {
            path: self.records.path_for(kind, id),
            source,
        })
    }

    fn with_tracker<R>(&self, f: impl FnOnce(&mut AccessTracker) -> R) -> R {
        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut tracker)
    }

    fn with_index<R>(&self, f: impl FnOnce(&mut Index) -> R) -> R {
        let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut index)
    }
}

async fn rebuild_index(records: &RecordStore) -> StoreResult<Index> {
    let mut index = Index::default();
    let now = now_ms();
    for kind in EntityKind::ALL {
        for id in records.list(kind).await? {
            index.touch(kind, &id, now);
        }
    }
    Ok(index)
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_store;
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[tokio::test]
    async fn test_get_populates_cache_from_disk() {
        let (_dir, store) = temp_store().await;
        let note = Note { text: "hi".into() };
        store.records().write(EntityKind::Tickets, "T1", &note).await.unwrap();
        assert!(!store.cache().contains("tickets:T1"));

        let got: Option<Note> = store.get(EntityKind::Tickets, "T1").await.unwrap();
        assert_eq!(got, Some(note));
        assert!(store.cache().contains("tickets:T1"));
    }

    #[tokio::test]
    async fn test_put_is_visible_in_cache_and_on_disk() {
        let (_dir, store) = temp_store().await;
        let note = Note { text: "saved".into() };
        store.put(EntityKind::Users, "5", &note).await.unwrap();

        let on_disk: Option<Note> = store.records().read(EntityKind::Users, "5").await.unwrap();
        assert_eq!(on_disk.as_ref(), Some(&note));
        assert!(store.index_snapshot().last_touched(EntityKind::Users, "5").is_some());
    }

    #[tokio::test]
    async fn test_unknown_record_is_none() {
        let (_dir, store) = temp_store().await;
        let got: Option<Note> = store.get(EntityKind::Users, "nobody").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_only_found_records_are_tracked() {
        let (_dir, store) = temp_store().await;
        for id in 0..20 {
            let _: Option<Note> = store.get(EntityKind::Users, &id.to_string()).await.unwrap();
        }
        assert_eq!(store.tracker.lock().unwrap().tracked_keys(), 0);

        store.put(EntityKind::Users, "1", &Note { text: "a".into() }).await.unwrap();
        store.cache().invalidate("users:1");
        let _: Option<Note> = store.get(EntityKind::Users, "1").await.unwrap();
        let _: Option<Note> = store.get(EntityKind::Users, "1").await.unwrap();
        let tracker = store.tracker.lock().unwrap();
        assert_eq!(tracker.tracked_keys(), 1);
        assert_eq!(tracker.history_len("users:1"), 2);
    }

    #[tokio::test]
    async fn test_scan_skips_corrupt_records() {
        let (_dir, store) = temp_store().await;
        store
            .put(EntityKind::Tickets, "ok", &Note { text: "a".into() })
            .await
            .unwrap();
        let bad = store.records().path_for(EntityKind::Tickets, "bad");
        tokio::fs::write(&bad, b"]]").await.unwrap();

        let all: Vec<Note> = store.scan(EntityKind::Tickets).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_prefetch_loads_predicted_keys() {
        let (_dir, store) = temp_store().await;
        let note = Note { text: "hot".into() };
        store.records().write(EntityKind::Tickets, "hot", &note).await.unwrap();

        // 80 accesses 1ms apart ending now -> confident, imminent prediction
        {
            let now = now_ms();
            let mut tracker = store.tracker.lock().unwrap();
            for i in 0..80 {
                tracker.record_access("tickets:hot", now - 79 + i);
            }
        }
        assert_eq!(store.refresh_predictions(), 1);
        assert_eq!(store.prefetch().await, 1);

        let (value, tier) = store.cache().lookup("tickets:hot").unwrap();
        assert_eq!(tier, CacheTier::Predictive);
        assert_eq!(value["text"], "hot");
    }

    #[tokio::test]
    async fn test_prefetch_swallows_corrupt_records() {
        let (_dir, store) = temp_store().await;
        let path = store.records().path_for(EntityKind::Tickets, "broken");
        tokio::fs::write(&path, b"nope").await.unwrap();
        {
            let now = now_ms();
            let mut tracker = store.tracker.lock().unwrap();
            for i in 0..80 {
                tracker.record_access("tickets:broken", now - 79 + i);
            }
        }
        store.refresh_predictions();
        assert_eq!(store.prefetch().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_persists_index_and_reopen_loads_it() {
        let (dir, store) = temp_store().await;
        store
            .put(EntityKind::Users, "1", &Note { text: "x".into() })
            .await
            .unwrap();
        store.cleanup().await.unwrap();
        assert!(dir.path().join("db").join(INDEX_FILE).is_file());

        let reopened = Store::open(store.config().clone()).await.unwrap();
        assert_eq!(reopened.index_snapshot().len(EntityKind::Users), 1);
    }

    #[tokio::test]
    async fn test_missing_index_is_rebuilt_from_listing() {
        let (_dir, store) = temp_store().await;
        store
            .records()
            .write(EntityKind::Tickets, "T9", &Note { text: "y".into() })
            .await
            .unwrap();
        let reopened = Store::open(store.config().clone()).await.unwrap();
        assert!(reopened
            .index_snapshot()
            .last_touched(EntityKind::Tickets, "T9")
            .is_some());
    }
}

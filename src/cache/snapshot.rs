//! File Snapshot Storage
//!
//! Wraps a [`TtlStore`] so that its contents survive restarts: `setup` loads
//! two JSON documents from a directory and `destroy` writes them back.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::cache::{
    current_timestamp_ms, ArmingPolicy, CacheStats, Entry, EntryMeta, MetaRecord, ResetTarget,
    Storage, TtlStore,
};
use crate::error::{CacheError, Result};

// == Public Constants ==
/// File holding key → entry
pub const DATA_FILE: &str = ".data.json";
/// File holding key → `{ updatedAt }`
pub const META_FILE: &str = ".meta.json";

// == File Storage ==
/// Durable variant of the in-memory store.
#[derive(Debug)]
pub struct FileStorage {
    store: TtlStore,
    data_path: PathBuf,
    meta_path: PathBuf,
}

impl FileStorage {
    /// Creates an empty store persisted under `dir`. Call [`Storage::setup`]
    /// before serving requests.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn new(dir: impl AsRef<Path>, ttl: Duration) -> Self {
        Self::with_policy(dir, ttl, ArmingPolicy::default())
    }

    pub fn with_policy(dir: impl AsRef<Path>, ttl: Duration, policy: ArmingPolicy) -> Self {
        let dir = dir.as_ref();
        Self {
            store: TtlStore::with_policy(ttl, policy),
            data_path: dir.join(DATA_FILE),
            meta_path: dir.join(META_FILE),
        }
    }

    /// The wrapped in-memory store.
    pub fn store(&self) -> &TtlStore {
        &self.store
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn meta_path(&self) -> &Path {
        &self.meta_path
    }

    // == Load ==
    async fn load(&self) -> Result<()> {
        let entries: HashMap<String, Entry> = read_document(&self.data_path).await?;
        let records: HashMap<String, MetaRecord> = read_document(&self.meta_path).await?;

        let ttl_ms = self.store.ttl().as_millis() as i64;
        let now_ms = current_timestamp_ms();
        let mut meta = HashMap::with_capacity(records.len());
        let mut expired = HashSet::new();
        for (key, record) in records {
            if now_ms - record.updated_at >= ttl_ms {
                expired.insert(key);
            } else {
                meta.insert(key, EntryMeta::from(record));
            }
        }

        let orphans = entries
            .keys()
            .filter(|k| !meta.contains_key(*k) && !expired.contains(*k))
            .count()
            + meta.keys().filter(|k| !entries.contains_key(*k)).count();
        if orphans > 0 {
            warn!(
                orphans,
                "snapshot documents disagree on keys; dropping unmatched entries"
            );
        }

        self.store.install(entries, meta);
        info!(
            path = %self.data_path.display(),
            loaded = self.store.len(),
            expired = expired.len(),
            "cache snapshot loaded"
        );
        Ok(())
    }

    // == Flush ==
    async fn flush(&self) -> Result<()> {
        let (entries, meta) = self.store.export();
        let records: HashMap<&String, MetaRecord> =
            meta.iter().map(|(k, m)| (k, MetaRecord::from(m))).collect();

        let data = serde_json::to_string(&entries)?;
        let meta_doc = serde_json::to_string(&records)?;

        // Attempt both documents even if the first write fails.
        let data_result = write_document(&self.data_path, &data).await;
        let meta_result = write_document(&self.meta_path, &meta_doc).await;
        data_result?;
        meta_result?;

        info!(
            path = %self.data_path.display(),
            entries = entries.len(),
            "cache snapshot written"
        );
        Ok(())
    }
}

async fn read_document<T>(path: &Path) -> Result<HashMap<String, T>>
where
    T: DeserializeOwned,
{
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot found, starting empty");
            return Ok(HashMap::new());
        }
        Err(source) => {
            return Err(CacheError::SnapshotRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&raw).map_err(|source| CacheError::SnapshotFormat {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_document(path: &Path, contents: &str) -> Result<()> {
    let write_err = |source: std::io::Error| CacheError::SnapshotWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)
}

#[async_trait]
impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<Entry> {
        self.store.get(key)
    }

    fn set(&self, key: &str, entry: Entry) {
        self.store.set(key, entry)
    }

    fn has(&self, key: &str) -> bool {
        self.store.has(key)
    }

    fn reset(&self, target: ResetTarget) {
        self.store.reset(target)
    }

    fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    async fn setup(&self) -> Result<()> {
        self.load().await
    }

    /// Writes both documents, then stops the timer even if a write failed.
    async fn destroy(&self) -> Result<()> {
        let flushed = self.flush().await;
        if let Err(err) = &flushed {
            warn!(error = %err, "failed to persist cache snapshot");
        }
        self.store.destroy();
        flushed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_setup_without_snapshot_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), TTL);

        assert_ok!(storage.setup().await);
        assert!(storage.store().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_across_instances() {
        let dir = TempDir::new().unwrap();
        let mut headers = crate::cache::Headers::new();
        headers.insert(
            "content-type".into(),
            crate::cache::HeaderValue::Single("text/plain".into()),
        );

        let first = FileStorage::new(dir.path(), TTL);
        assert_ok!(first.setup().await);
        first.set("a", Entry::new(json!("pong")));
        first.set("b", Entry::response(json!({"n": [1, 2]}), 201, headers));
        first.set("c", Entry::new(json!(null)));
        assert_ok!(first.destroy().await);

        let second = FileStorage::new(dir.path(), TTL);
        assert_ok!(second.setup().await);
        for key in ["a", "b", "c"] {
            assert_eq!(second.get(key), first.get(key), "mismatch for {}", key);
        }
        assert_eq!(second.store().len(), 3);
        assert!(matches!(
            second.store().watcher_state(),
            crate::cache::WatcherState::Armed { .. }
        ));
    }

    #[tokio::test]
    async fn test_remaining_ttl_survives_restart() {
        let dir = TempDir::new().unwrap();

        let first = FileStorage::new(dir.path(), TTL);
        first.set("a", Entry::new(json!(1)));
        let written_at = first.store().meta("a").unwrap().to_unix_ms();
        assert_ok!(first.destroy().await);

        let second = FileStorage::new(dir.path(), TTL);
        assert_ok!(second.setup().await);
        let restored = second.store().meta("a").unwrap().to_unix_ms();
        assert!((restored - written_at).abs() < 100);
    }

    #[tokio::test]
    async fn test_expired_entries_dropped_on_load() {
        let dir = TempDir::new().unwrap();
        let old = current_timestamp_ms() - 120_000;
        std::fs::write(dir.path().join(DATA_FILE), r#"{"old":{"payload":1},"new":{"payload":2}}"#)
            .unwrap();
        std::fs::write(
            dir.path().join(META_FILE),
            format!(
                r#"{{"old":{{"updatedAt":{}}},"new":{{"updatedAt":{}}}}}"#,
                old,
                current_timestamp_ms()
            ),
        )
        .unwrap();

        let storage = FileStorage::new(dir.path(), TTL);
        assert_ok!(storage.setup().await);
        assert!(!storage.has("old"));
        assert!(storage.has("new"));
    }

    #[tokio::test]
    async fn test_orphan_keys_dropped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DATA_FILE), r#"{"a":{"payload":1},"b":{"payload":2}}"#)
            .unwrap();
        std::fs::write(
            dir.path().join(META_FILE),
            format!(r#"{{"a":{{"updatedAt":{}}}}}"#, current_timestamp_ms()),
        )
        .unwrap();

        let storage = FileStorage::new(dir.path(), TTL);
        assert_ok!(storage.setup().await);
        assert!(storage.has("a"));
        assert!(!storage.has("b"));
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DATA_FILE), "{not json").unwrap();

        let storage = FileStorage::new(dir.path(), TTL);
        let result = storage.setup().await;
        assert!(matches!(result, Err(CacheError::SnapshotFormat { .. })));
    }

    #[tokio::test]
    async fn test_non_object_snapshot_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(META_FILE), "[1, 2, 3]").unwrap();

        let storage = FileStorage::new(dir.path(), TTL);
        assert!(matches!(
            storage.setup().await,
            Err(CacheError::SnapshotFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_is_fatal() {
        let dir = TempDir::new().unwrap();
        // A directory where the data file should be cannot be read as a file.
        std::fs::create_dir(dir.path().join(DATA_FILE)).unwrap();

        let storage = FileStorage::new(dir.path(), TTL);
        assert!(matches!(
            storage.setup().await,
            Err(CacheError::SnapshotRead { .. })
        ));
    }

    #[tokio::test]
    async fn test_destroy_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("memo").join("cache");

        let storage = FileStorage::new(&nested, TTL);
        storage.set("a", Entry::new(json!(1)));
        assert_ok!(storage.destroy().await);

        assert!(nested.join(DATA_FILE).is_file());
        assert!(nested.join(META_FILE).is_file());
        let meta: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(nested.join(META_FILE)).unwrap())
                .unwrap();
        assert!(meta["a"]["updatedAt"].is_i64());
    }

    #[tokio::test]
    async fn test_write_failure_still_stops_timer() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let storage = FileStorage::new(&blocker, TTL);
        storage.set("a", Entry::new(json!(1)));

        let result = storage.destroy().await;
        assert!(matches!(result, Err(CacheError::SnapshotWrite { .. })));
        assert_eq!(
            storage.store().watcher_state(),
            crate::cache::WatcherState::Idle
        );
        assert!(storage.has("a"));
    }
}

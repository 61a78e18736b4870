//! Cache Facade
//!
//! Public get/set surface over a [`Storage`] backend. External callers deal in
//! bare payloads; status codes and headers stay with the request hooks.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, Entry, FileStorage, MemoryStorage, ResetTarget, Storage};
use crate::config::CacheOptions;
use crate::error::Result;

// == Light Cache ==
/// Cheaply clonable handle to a cache backend.
#[derive(Debug, Clone)]
pub struct LightCache {
    storage: Arc<dyn Storage>,
}

impl LightCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// In-memory cache with the given TTL.
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryStorage::new(ttl)))
    }

    /// Picks the file-backed storage when `persist_dir` is set, memory otherwise.
    ///
    /// Call [`LightCache::setup`] before serving requests.
    pub fn from_options(options: &CacheOptions) -> Self {
        let storage: Arc<dyn Storage> = match &options.persist_dir {
            Some(dir) => Arc::new(FileStorage::with_policy(
                dir,
                options.ttl,
                options.arming_policy,
            )),
            None => Arc::new(MemoryStorage::with_policy(options.ttl, options.arming_policy)),
        };
        Self::new(storage)
    }

    /// Returns the payload stored under `key`, decoded as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_value(key)
            .map(|payload| serde_json::from_value(payload).map_err(Into::into))
            .transpose()
    }

    /// Returns the raw payload stored under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.storage.get(key).map(|entry| entry.payload)
    }

    /// Stores `payload` under `key`, overwriting any previous value.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, payload: &T) -> Result<()> {
        let value = serde_json::to_value(payload)?;
        self.storage.set(key, Entry::new(value));
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.storage.has(key)
    }

    /// Removes one key, several keys, or with [`ResetTarget::All`] everything.
    pub fn reset(&self, target: impl Into<ResetTarget>) {
        self.storage.reset(target.into());
    }

    pub fn stats(&self) -> CacheStats {
        self.storage.stats()
    }

    pub async fn setup(&self) -> Result<()> {
        self.storage.setup().await
    }

    pub async fn destroy(&self) -> Result<()> {
        self.storage.destroy().await
    }

    /// The underlying backend, for hooks that need full entries.
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }
}

//! Storage Interface
//!
//! Capability trait shared by the in-memory store and the snapshot wrapper.

use async_trait::async_trait;

use crate::cache::{CacheStats, Entry, TtlStore};
use crate::error::Result;

// == Reset Target ==
/// Which entries a reset removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetTarget {
    All,
    Keys(Vec<String>),
}

impl From<&str> for ResetTarget {
    fn from(key: &str) -> Self {
        ResetTarget::Keys(vec![key.to_string()])
    }
}

impl From<String> for ResetTarget {
    fn from(key: String) -> Self {
        ResetTarget::Keys(vec![key])
    }
}

impl From<Vec<String>> for ResetTarget {
    fn from(keys: Vec<String>) -> Self {
        ResetTarget::Keys(keys)
    }
}

impl From<&[&str]> for ResetTarget {
    fn from(keys: &[&str]) -> Self {
        ResetTarget::Keys(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<T: Into<ResetTarget>> From<Option<T>> for ResetTarget {
    fn from(target: Option<T>) -> Self {
        target.map_or(ResetTarget::All, Into::into)
    }
}

// == Storage ==
/// Operations a cache backend offers to the facade and the request hooks.
///
/// `get`, `has`, `set` and `reset` never fail and never suspend. Only
/// `setup` and `destroy` may perform I/O.
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<Entry>;

    fn set(&self, key: &str, entry: Entry);

    fn has(&self, key: &str) -> bool;

    fn reset(&self, target: ResetTarget);

    fn stats(&self) -> CacheStats;

    /// Loads initial state. Must complete before the first lookup.
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    /// Stops the eviction timer, flushing first where the backend persists.
    async fn destroy(&self) -> Result<()>;
}

/// The plain in-memory backend.
pub type MemoryStorage = TtlStore;

#[async_trait]
impl Storage for TtlStore {
    fn get(&self, key: &str) -> Option<Entry> {
        TtlStore::get(self, key)
    }

    fn set(&self, key: &str, entry: Entry) {
        TtlStore::set(self, key, entry)
    }

    fn has(&self, key: &str) -> bool {
        TtlStore::has(self, key)
    }

    fn reset(&self, target: ResetTarget) {
        TtlStore::reset(self, target)
    }

    fn stats(&self) -> CacheStats {
        TtlStore::stats(self)
    }

    async fn destroy(&self) -> Result<()> {
        TtlStore::destroy(self);
        Ok(())
    }
}

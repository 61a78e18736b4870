//! Cache Module
//!
//! Time-indexed response store with a single eviction timer, plus the
//! storage interface and its file-backed snapshot variant.

mod entry;
mod queue;
mod snapshot;
mod stats;
mod storage;
mod store;
mod watcher;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, Entry, EntryMeta, HeaderValue, Headers, MetaRecord};
pub use queue::ExpiryQueue;
pub use snapshot::{FileStorage, DATA_FILE, META_FILE};
pub use stats::CacheStats;
pub use storage::{MemoryStorage, ResetTarget, Storage};
pub use store::{ArmingPolicy, TtlStore, WatcherState};

// == Public Constants ==
/// Largest request or response body the hooks buffer, in bytes
pub const MAX_BODY_SIZE: usize = 1024 * 1024; // 1 MB

//! TTL Store Module
//!
//! Entry and meta maps guarded by one mutex, plus the watcher state that
//! tracks the single armed eviction timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::watcher::spawn_watcher;
use crate::cache::{CacheStats, Entry, EntryMeta, ExpiryQueue, ResetTarget};

// == Arming Policy ==
/// When the eviction timer is re-targeted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmingPolicy {
    /// Re-target after every mutation so the timer always points at the
    /// soonest deadline.
    #[default]
    Eager,
    /// Arm only on the empty to non-empty transition and re-target when the
    /// timer fires. A write that expires sooner than the armed target waits
    /// for that timer.
    Lazy,
}

// == Watcher State ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Armed { key: String, fire_at: Instant },
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    entries: HashMap<String, Entry>,
    meta: HashMap<String, EntryMeta>,
    queue: ExpiryQueue,
    watcher: Option<(String, Instant)>,
    stats: CacheStats,
    destroyed: bool,
}

/// State shared between the store handle and its watcher task.
#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<StoreState>,
    ttl: Duration,
    policy: ArmingPolicy,
    pub(crate) rearm: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deadline of the armed timer, if any.
    pub(crate) fn armed_deadline(&self) -> Option<Instant> {
        self.lock().watcher.as_ref().map(|(_, at)| *at)
    }

    /// Points the watcher at the soonest live deadline, waking the timer task
    /// if the target changed.
    fn rearm(&self, state: &mut StoreState) {
        if state.destroyed {
            state.watcher = None;
            return;
        }

        let next = state.queue.soonest(&state.meta, self.ttl);
        if next != state.watcher {
            match &next {
                Some((key, _)) => {
                    let remaining = state
                        .meta
                        .get(key)
                        .map(|m| m.remaining(self.ttl, Instant::now()))
                        .unwrap_or_default();
                    debug!(key = %key, remaining_ms = remaining.as_millis() as u64, "eviction timer armed");
                }
                None => debug!("eviction timer idle"),
            }
            state.watcher = next;
            self.rearm.notify_one();
        }
    }

    /// Timer callback: evicts the armed key if its deadline has passed and
    /// re-arms for the next soonest entry.
    pub(crate) fn fire(&self) {
        let mut state = self.lock();
        let Some((key, fire_at)) = state.watcher.clone() else {
            return;
        };

        let now = Instant::now();
        if now < fire_at {
            return;
        }

        let expired = state
            .meta
            .get(&key)
            .is_some_and(|m| m.deadline(self.ttl) <= now);
        if expired {
            state.entries.remove(&key);
            state.meta.remove(&key);
            state.stats.record_expiration();
            debug!(key = %key, remaining = state.entries.len(), "entry expired");
        }

        self.rearm(&mut state);
    }
}

// == TTL Store ==
/// In-memory response store with time-to-live eviction.
///
/// Entries live for `ttl` from their last write; reads never extend it.
/// Exactly one timer task serves each store and is armed only while the
/// store holds entries.
#[derive(Debug)]
pub struct TtlStore {
    shared: Arc<Shared>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl TtlStore {
    // == Constructor ==
    /// Creates an empty store using the eager arming policy.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime, which drives the eviction timer.
    pub fn new(ttl: Duration) -> Self {
        Self::with_policy(ttl, ArmingPolicy::default())
    }

    /// Creates an empty store with an explicit arming policy.
    pub fn with_policy(ttl: Duration, policy: ArmingPolicy) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(StoreState::default()),
            ttl,
            policy,
            rearm: Notify::new(),
        });
        let handle = spawn_watcher(shared.clone());

        Self {
            shared,
            watcher: Mutex::new(Some(handle)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.shared.ttl
    }

    pub fn policy(&self) -> ArmingPolicy {
        self.shared.policy
    }

    // == Get ==
    /// Returns a copy of the entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<Entry> {
        let mut state = self.shared.lock();
        let entry = state.entries.get(key).cloned();
        state.stats.record_lookup(entry.is_some());
        entry
    }

    // == Has ==
    pub fn has(&self, key: &str) -> bool {
        self.shared.lock().entries.contains_key(key)
    }

    // == Set ==
    /// Stores `entry` under `key`, restarting its TTL.
    pub fn set(&self, key: impl Into<String>, entry: Entry) {
        let key = key.into();
        let meta = EntryMeta::now();
        let mut state = self.shared.lock();
        let was_idle = state.watcher.is_none();

        state.queue.push(key.clone(), meta.deadline(self.shared.ttl));
        state.meta.insert(key.clone(), meta);
        state.entries.insert(key, entry);

        if was_idle || self.shared.policy == ArmingPolicy::Eager {
            self.shared.rearm(&mut state);
        }

        let StoreState { queue, meta, .. } = &mut *state;
        queue.compact(meta, self.shared.ttl);
    }

    // == Reset ==
    /// Removes the targeted entries; [`ResetTarget::All`] clears the store.
    pub fn reset(&self, target: impl Into<ResetTarget>) {
        let mut state = self.shared.lock();

        match target.into() {
            ResetTarget::All => {
                state.entries.clear();
                state.meta.clear();
                state.queue.clear();
            }
            ResetTarget::Keys(keys) => {
                for key in keys {
                    state.entries.remove(&key);
                    state.meta.remove(&key);
                }
            }
        }

        let target_removed = state
            .watcher
            .as_ref()
            .is_some_and(|(key, _)| !state.meta.contains_key(key));
        if target_removed || state.meta.is_empty() {
            self.shared.rearm(&mut state);
        }
    }

    // == Destroy ==
    /// Cancels the eviction timer. Entries stay in place and no longer expire.
    pub fn destroy(&self) {
        let handle = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("eviction watcher stopped");
        }

        let mut state = self.shared.lock();
        state.destroyed = true;
        state.watcher = None;
    }

    // == Snapshot Access ==
    /// Copies both maps under a single lock.
    pub fn export(&self) -> (HashMap<String, Entry>, HashMap<String, EntryMeta>) {
        let state = self.shared.lock();
        (state.entries.clone(), state.meta.clone())
    }

    /// Replaces the store contents. Keys missing from either map are dropped
    /// so both maps keep identical key sets.
    pub fn install(&self, mut entries: HashMap<String, Entry>, mut meta: HashMap<String, EntryMeta>) {
        entries.retain(|key, _| meta.contains_key(key));
        meta.retain(|key, _| entries.contains_key(key));

        let ttl = self.shared.ttl;
        let mut state = self.shared.lock();
        state.queue.clear();
        for (key, m) in &meta {
            state.queue.push(key.clone(), m.deadline(ttl));
        }
        state.entries = entries;
        state.meta = meta;
        self.shared.rearm(&mut state);
    }

    // == Introspection ==
    pub fn watcher_state(&self) -> WatcherState {
        match &self.shared.lock().watcher {
            Some((key, fire_at)) => WatcherState::Armed {
                key: key.clone(),
                fire_at: *fire_at,
            },
            None => WatcherState::Idle,
        }
    }

    /// Write timestamp of `key`.
    pub fn meta(&self, key: &str) -> Option<EntryMeta> {
        self.shared.lock().meta.get(key).copied()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.shared.lock();
        let mut stats = state.stats.clone();
        stats.total_entries = state.entries.len();
        stats
    }

    pub fn keys(&self) -> Vec<String> {
        self.shared.lock().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().entries.is_empty()
    }
}

impl Drop for TtlStore {
    fn drop(&mut self) {
        let handle = self
            .watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

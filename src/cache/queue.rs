//! Expiry Queue Module
//!
//! Min-heap of entry deadlines used to find the soonest-expiring key.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::EntryMeta;

// == Expiry Queue ==
/// Tracks `(deadline, key)` pairs ordered by deadline.
///
/// Overwrites and removals are not deleted from the heap eagerly. A queued
/// deadline is live only while it equals the deadline derived from the key's
/// current meta; anything else is discarded when it reaches the top.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    heap: BinaryHeap<Reverse<(Instant, String)>>,
}

impl ExpiryQueue {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    // == Push ==
    /// Queues `key` to expire at `deadline`.
    pub fn push(&mut self, key: String, deadline: Instant) {
        self.heap.push(Reverse((deadline, key)));
    }

    // == Soonest ==
    /// Returns the live key with the earliest deadline, dropping stale heads.
    pub fn soonest(
        &mut self,
        meta: &HashMap<String, EntryMeta>,
        ttl: Duration,
    ) -> Option<(String, Instant)> {
        while let Some(Reverse((deadline, key))) = self.heap.peek() {
            let live = meta
                .get(key)
                .is_some_and(|m| m.deadline(ttl) == *deadline);
            if live {
                return Some((key.clone(), *deadline));
            }
            self.heap.pop();
        }
        None
    }

    // == Compact ==
    /// Rebuilds the heap from `meta` once stale items outnumber live ones.
    pub fn compact(&mut self, meta: &HashMap<String, EntryMeta>, ttl: Duration) {
        if self.heap.len() <= meta.len().saturating_mul(2).max(16) {
            return;
        }
        self.heap = meta
            .iter()
            .map(|(key, m)| Reverse((m.deadline(ttl), key.clone())))
            .collect();
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    // == Length ==
    /// Number of queued items, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

//! Eviction Watcher
//!
//! Background task that sleeps until the armed deadline of a store and then
//! evicts the targeted entry.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::store::Shared;

/// Spawns the single timer task serving a store.
///
/// The task waits on the store's notifier while the watcher is idle, and on
/// the earlier of the armed deadline or a re-target notification while armed.
/// It runs until aborted by `TtlStore::destroy` or the store being dropped.
pub(crate) fn spawn_watcher(shared: Arc<Shared>) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("eviction watcher started");

        loop {
            match shared.armed_deadline() {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => shared.fire(),
                        _ = shared.rearm.notified() => {}
                    }
                }
                None => shared.rearm.notified().await,
            }
        }
    })
}

//! Expired Entry Cleanup Task
//!
//! Background task that periodically drops expired cache entries so they stop
//! occupying storage quota.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that runs [`CacheStore::clear_expired`] every
/// `interval`.
///
/// Reads never delete expired entries (they remain available as stale
/// fallback), so this is the only path that reclaims them between
/// quota-driven recoveries.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = CacheStore::in_memory(DEFAULT_TTL);
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(3600));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: CacheStore, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.clear_expired();

            if removed > 0 {
                info!("Cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("Cache cleanup: no expired entries found");
            }
        }
    })
}

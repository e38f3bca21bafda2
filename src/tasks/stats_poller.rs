//! Stats Poller Task
//!
//! Reads cache statistics on a fixed interval for display purposes.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::cache::StatsSnapshot;
use crate::facade::{CacheValue, WeakCache};

/// Spawns a task that hands `get_stats()` to `on_stats` every `interval`.
///
/// Polling only reads; it never changes entries, recency or counters.
/// The task ends once the cache is dropped. A zero interval is raised to
/// one millisecond.
pub fn spawn_stats_poller<V, F>(cache: WeakCache<V>, interval: Duration, mut on_stats: F) -> JoinHandle<()>
where
    V: CacheValue,
    F: FnMut(StatsSnapshot) + Send + 'static,
{
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Some(cache) = cache.upgrade() else {
                debug!("cache dropped, stopping stats poller");
                break;
            };
            on_stats(cache.get_stats().await);
        }
    })
}

//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::facade::{CacheValue, WeakCache};

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task sleeps for `interval` between runs and holds only a weak
/// handle, so it ends on its own once the cache is dropped.
///
/// # Arguments
/// * `cache` - Weak handle to the cache to sweep
/// * `interval` - Time between cleanup runs, must be non-zero
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
pub fn spawn_cleanup_task<V: CacheValue>(cache: WeakCache<V>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} ms",
            interval.as_millis()
        );

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(cache) = cache.upgrade() else {
                debug!("cache dropped, stopping TTL cleanup task");
                break;
            };
            let removed = cache.cleanup_expired().await;

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

// == Cleanup Scheduler ==
/// Owns the cleanup task and makes start/stop explicit.
#[derive(Debug)]
pub struct CleanupScheduler {
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CleanupScheduler {
    /// A zero interval creates a scheduler that never starts.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: Mutex::new(None),
        }
    }

    /// Spawns the cleanup task. Returns false if disabled or already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<V: CacheValue>(&self, cache: WeakCache<V>) -> bool {
        if self.interval.is_zero() {
            debug!("TTL cleanup disabled");
            return false;
        }

        let mut handle = self.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        *handle = Some(spawn_cleanup_task(cache, self.interval));
        true
    }

    /// Aborts the cleanup task. Returns false if none was running.
    pub fn stop(&self) -> bool {
        match self.lock().take() {
            Some(handle) => {
                handle.abort();
                debug!("TTL cleanup task stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Stats Poller: Reads statistics on an interval for display

mod cleanup;
mod stats_poller;

pub use cleanup::{spawn_cleanup_task, CleanupScheduler};
pub use stats_poller::spawn_stats_poller;

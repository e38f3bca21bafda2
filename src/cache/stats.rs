//! Cache Statistics Module
//!
//! Tracks cache performance counters and derives the figures shown to observers.

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Monotonic counters, reset only by `clear()`.
///
/// This is also the `stats` object written into persisted snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads answered with a fresh value
    pub hits: u64,
    /// Reads for absent or expired keys
    pub misses: u64,
    /// Inserts and replacements
    pub sets: u64,
    /// Explicit deletions that removed an entry
    pub deletes: u64,
    /// Entries dropped for capacity or found expired on lookup
    pub evictions: u64,
    /// Completed proactive sweeps
    pub cleanups: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Hit rate as a whole percentage, 0 when no reads were made.
    pub fn hit_rate(&self) -> f64 {
        percentage(self.hits, self.hits + self.misses)
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_cleanup(&mut self) {
        self.cleanups += 1;
    }

    // == Reset ==
    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // == Snapshot ==
    /// Combines the counters with the store's current size.
    pub fn snapshot(&self, size: usize, max_size: usize) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits,
            misses: self.misses,
            sets: self.sets,
            deletes: self.deletes,
            evictions: self.evictions,
            cleanups: self.cleanups,
            size,
            max_size,
            hit_rate: self.hit_rate(),
            utilization: percentage(size as u64, max_size as u64),
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view of the cache returned by `get_stats()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub cleanups: u64,
    /// Current number of entries
    pub size: usize,
    /// Configured entry ceiling
    pub max_size: usize,
    /// `hits / (hits + misses) * 100`, rounded
    pub hit_rate: f64,
    /// `size / max_size * 100`, rounded
    pub utilization: f64,
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 100.0).round()
    }
}

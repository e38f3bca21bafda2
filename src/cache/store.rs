//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.
//!
//! The store never reads the clock itself: every time-dependent operation
//! takes `now` in Unix milliseconds from the caller.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruIndex, StatsSnapshot};

// == Cache Store ==
/// Bounded key/value storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU recency index
    lru: LruIndex,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_size: usize,
    /// TTL in milliseconds for entries stored without an explicit TTL
    default_ttl_ms: u64,
    /// Next insertion sequence number
    next_seq: u64,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(max_size: usize, default_ttl_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruIndex::new(),
            stats: CacheStats::new(),
            max_size: max_size.max(1),
            default_ttl_ms,
            next_seq: 0,
        }
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for `key`.
    ///
    /// A replacement gets a new creation time and a zero access count but
    /// keeps its insertion position. Inserting a new key into a full store
    /// first evicts the least recently used entry.
    pub fn set(&mut self, key: String, value: V, ttl_ms: Option<u64>, now: u64) {
        let existing_seq = self.entries.get(&key).map(|entry| entry.seq);

        if existing_seq.is_none() && self.entries.len() >= self.max_size {
            self.evict_lru();
        }

        let seq = existing_seq.unwrap_or_else(|| self.allocate_seq());
        let ttl_ms = ttl_ms.unwrap_or(self.default_ttl_ms);

        self.lru.touch(&key, now, seq);
        self.entries
            .insert(key.clone(), CacheEntry::new(key, value, ttl_ms, now, seq));
        self.stats.record_set();
    }

    // == Get ==
    /// Retrieves a fresh value by key, marking it as recently used.
    ///
    /// An expired entry is removed on the spot and counts as both a miss
    /// and an eviction.
    pub fn get(&mut self, key: &str, now: u64) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_miss();
            self.stats.record_eviction();
            debug!(key, "dropped expired entry on read");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        self.lru.touch(key, entry.last_accessed, entry.seq);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    // == Has ==
    /// Reports whether a fresh entry exists without touching its recency.
    ///
    /// Expired entries are removed as in `get` and counted as evictions;
    /// hits and misses are left alone.
    pub fn has(&mut self, key: &str, now: u64) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_eviction();
        }
        !expired
    }

    // == Delete ==
    /// Removes an entry by key, returning whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key).is_some();
        if removed {
            self.stats.record_delete();
        }
        removed
    }

    // == Clear ==
    /// Removes every entry and zeroes all statistics.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.reset();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Counts one cleanup per call, whatever the number removed.
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self, now: u64) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_cleanup();
        expired_keys.len()
    }

    // == Restore ==
    /// Replaces the store's contents with previously persisted entries.
    ///
    /// Entries keep their timestamps and access counts; their order in
    /// `entries` becomes the insertion order. Anything beyond capacity is
    /// evicted by the usual LRU rule.
    pub fn restore(&mut self, entries: Vec<CacheEntry<V>>, stats: CacheStats) {
        self.entries.clear();
        self.lru.clear();
        self.stats = stats;

        for mut entry in entries {
            entry.seq = self.allocate_seq();
            self.lru.touch(&entry.key, entry.last_accessed, entry.seq);
            self.entries.insert(entry.key.clone(), entry);
        }

        while self.entries.len() > self.max_size {
            if self.evict_lru().is_none() {
                break;
            }
        }
    }

    // == Introspection ==
    /// Returns entries in insertion order without touching them.
    pub fn entries_in_order(&self) -> Vec<&CacheEntry<V>> {
        let mut entries: Vec<&CacheEntry<V>> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
    }

    /// Returns the raw counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Returns counters combined with size and utilization.
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot(self.entries.len(), self.max_size)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }

    // == Internals ==
    fn evict_lru(&mut self) -> Option<String> {
        let key = self.lru.evict_oldest()?;
        self.entries.remove(&key);
        self.stats.record_eviction();
        debug!(key = %key, "evicted least recently used entry");
        Some(key)
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        Some(entry)
    }

    fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

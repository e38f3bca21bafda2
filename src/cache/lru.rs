//! LRU Index Module
//!
//! Orders keys by recency for least-recently-used eviction.

use std::collections::{BTreeMap, HashMap};

/// Position of a key in the recency order: `(last_accessed, insertion seq)`.
type Rank = (u64, u64);

// == LRU Index ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys are ranked by `(last_accessed, seq)`:
/// - First = least recently used, earliest inserted among equal timestamps
/// - Last = most recently used
#[derive(Debug, Default)]
pub struct LruIndex {
    /// Keys ordered by rank
    order: BTreeMap<Rank, String>,
    /// Current rank of every tracked key
    ranks: HashMap<String, Rank>,
}

impl LruIndex {
    // == Constructor ==
    /// Creates a new empty LRU index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Records that `key` was last used at `last_accessed`.
    ///
    /// If the key is already tracked its previous rank is dropped first.
    pub fn touch(&mut self, key: &str, last_accessed: u64, seq: u64) {
        self.remove(key);
        let rank = (last_accessed, seq);
        self.order.insert(rank, key.to_string());
        self.ranks.insert(key.to_string(), rank);
    }

    // == Remove ==
    /// Removes a key from the index.
    pub fn remove(&mut self, key: &str) {
        if let Some(rank) = self.ranks.remove(key) {
            self.order.remove(&rank);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if the index is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ranks.remove(&key);
        Some(key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.ranks.clear();
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ranks.contains_key(key)
    }
}

//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access tracking.

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The key this entry is stored under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Timestamp of the last successful read (Unix milliseconds)
    pub last_accessed: u64,
    /// Time-to-live in milliseconds, measured from `created_at`
    pub ttl_ms: u64,
    /// Successful reads since creation
    pub access_count: u64,
    /// Insertion sequence, breaks ties between equal `last_accessed` values
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a fresh entry created and last accessed at `now`.
    pub fn new(key: String, value: V, ttl_ms: u64, now: u64, seq: u64) -> Self {
        Self {
            key,
            value,
            created_at: now,
            last_accessed: now,
            ttl_ms,
            access_count: 0,
            seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived its TTL.
    ///
    /// Boundary condition: an entry whose age equals its TTL is still fresh;
    /// it expires once the age is strictly greater. Reads do not extend the
    /// lifetime.
    pub fn is_expired(&self, now: u64) -> bool {
        self.age_ms(now) > self.ttl_ms
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed = now;
        self.access_count += 1;
    }

    /// Milliseconds since creation.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Milliseconds since the last successful read (or creation).
    pub fn idle_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_accessed)
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, 0 once expired.
    pub fn expires_in_ms(&self, now: u64) -> u64 {
        self.ttl_ms.saturating_sub(self.age_ms(now))
    }
}

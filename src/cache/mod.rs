//! Cache Module
//!
//! Provides the in-memory store with TTL expiration and LRU eviction.

mod clock;
mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use lru::LruIndex;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;

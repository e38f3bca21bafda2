//! Farm Cache - bounded in-process cache for the farm-management app
//!
//! Entry-count bounded key/value store with LRU eviction, TTL expiry (lazy
//! and swept), JSON snapshots to durable storage, hit/miss statistics and a
//! memoization wrapper for async calls.
//!
//! ```ignore
//! let cache: Cache = Cache::builder(CacheConfig::default())
//!     .storage(Arc::new(FileStorage::new("./data")))
//!     .build();
//! cache.init().await;
//!
//! let animals = cache.with_cache(
//!     |farm_id: u32| async move { api.list_animals(farm_id).await },
//!     |farm_id: &u32| format!("animals:{farm_id}"),
//!     Some(60_000),
//! );
//! let list = animals.call(3).await?;
//!
//! cache.destroy().await;
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod facade;
pub mod models;
pub mod persistence;
pub mod tasks;

pub use api::AppState;
pub use cache::{Clock, ManualClock, StatsSnapshot, SystemClock};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
pub use facade::{Cache, CacheInfo, ItemInfo, Memoized, StatsSubscription};
pub use persistence::{FileStorage, MemoryStorage, SnapshotStorage};
pub use tasks::{spawn_cleanup_task, spawn_stats_poller};

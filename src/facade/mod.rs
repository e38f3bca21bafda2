//! Facade Module
//!
//! Public cache handle, memoization wrapper and stats subscription.

mod cache;
mod memoize;
mod observe;

pub use cache::{Cache, CacheBuilder, CacheInfo, CacheValue, ItemInfo, WeakCache};
pub use memoize::Memoized;
pub use observe::StatsSubscription;

//! Cache Facade
//!
//! The handle application code talks to. It composes the store, the
//! persistence adapter, the cleanup scheduler and the stats channel, and
//! makes every public call one atomic transition under the store lock.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

use crate::cache::{CacheStore, Clock, StatsSnapshot, SystemClock};
use crate::config::CacheConfig;
use crate::facade::{Memoized, StatsSubscription};
use crate::persistence::{PendingSnapshot, PersistenceAdapter, SnapshotStorage};
use crate::tasks::CleanupScheduler;

// == Cache Value ==
/// Anything the cache can hold and persist.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

// == Introspection Types ==
/// Per-entry view returned by [`Cache::get_info`]. Durations are milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct ItemInfo {
    pub key: String,
    /// Time since creation
    pub age: u64,
    /// Time since the last successful read
    pub last_accessed_age: u64,
    pub access_count: u64,
    pub ttl: u64,
    /// Remaining lifetime, 0 once expired
    pub expires_in: u64,
}

/// Debugging snapshot of the whole cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub stats: StatsSnapshot,
    /// Entries in insertion order
    pub items: Vec<ItemInfo>,
    pub config: CacheConfig,
}

// == Cache ==
/// Shared handle to a cache instance; clones point at the same cache.
///
/// Built once by the application root and passed to whoever needs it.
pub struct Cache<V = Value> {
    inner: Arc<CacheInner<V>>,
}

struct CacheInner<V> {
    store: RwLock<CacheStore<V>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    persistence: Option<Arc<PersistenceAdapter>>,
    stats_tx: watch::Sender<StatsSnapshot>,
    cleanup: CleanupScheduler,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.inner.config)
            .field("persistent", &self.inner.persistence.is_some())
            .finish()
    }
}

/// Non-owning handle held by background tasks.
pub struct WeakCache<V> {
    inner: Weak<CacheInner<V>>,
}

impl<V> WeakCache<V> {
    /// Returns the cache if it is still alive.
    pub fn upgrade(&self) -> Option<Cache<V>> {
        self.inner.upgrade().map(|inner| Cache { inner })
    }
}

impl<V> Clone for WeakCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

// == Builder ==
/// Assembles a [`Cache`] from its configuration and collaborators.
pub struct CacheBuilder<V> {
    config: CacheConfig,
    storage: Option<Arc<dyn SnapshotStorage>>,
    clock: Arc<dyn Clock>,
    _value: PhantomData<fn() -> V>,
}

impl<V: CacheValue> CacheBuilder<V> {
    /// Durable medium for snapshots. Ignored when persistence is disabled.
    pub fn storage(mut self, storage: Arc<dyn SnapshotStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Time source, [`SystemClock`] by default.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build(self) -> Cache<V> {
        let config = self.config;
        let store = CacheStore::new(config.max_size, config.ttl_ms);
        let (stats_tx, _) = watch::channel(store.stats_snapshot());

        let persistence = match self.storage {
            Some(storage) if config.enable_persistence => {
                Some(Arc::new(PersistenceAdapter::new(
                    storage,
                    config.persistence_key.clone(),
                )))
            }
            _ => None,
        };

        let cleanup = CleanupScheduler::new(Duration::from_millis(config.cleanup_interval_ms));

        Cache {
            inner: Arc::new(CacheInner {
                store: RwLock::new(store),
                config,
                clock: self.clock,
                persistence,
                stats_tx,
                cleanup,
            }),
        }
    }
}

impl<V: CacheValue> Cache<V> {
    // == Construction ==
    pub fn builder(config: CacheConfig) -> CacheBuilder<V> {
        CacheBuilder {
            config,
            storage: None,
            clock: Arc::new(SystemClock),
            _value: PhantomData,
        }
    }

    /// Memory-only cache on the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::builder(config).build()
    }

    // == Lifecycle ==
    /// Restores the persisted snapshot and starts the cleanup scheduler.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn init(&self) {
        if let Some(persistence) = &self.inner.persistence {
            let now = self.now();
            if let Some(restored) = persistence.load::<V>(now).await {
                info!(
                    key = persistence.key(),
                    restored = restored.entries.len(),
                    dropped = restored.dropped,
                    snapshot_age_ms = now.saturating_sub(restored.saved_at),
                    "cache snapshot restored"
                );
                let stats = {
                    let mut store = self.inner.store.write().await;
                    store.restore(restored.entries, restored.stats);
                    store.stats_snapshot()
                };
                self.publish(stats);
            }
        }

        self.start_cleanup();
        info!(
            max_size = self.inner.config.max_size,
            ttl_ms = self.inner.config.ttl_ms,
            persistent = self.inner.persistence.is_some(),
            "cache initialized"
        );
    }

    /// Stops the cleanup scheduler and writes a final snapshot.
    pub async fn destroy(&self) {
        self.stop_cleanup();
        let pending = {
            let store = self.inner.store.read().await;
            self.capture(&store, self.now())
        };
        self.write_now(pending).await;
        info!("cache destroyed");
    }

    /// Waits until every snapshot written in the background has landed.
    pub async fn flush(&self) {
        if let Some(persistence) = &self.inner.persistence {
            persistence.flush().await;
        }
    }

    /// Starts proactive sweeps. Returns false if already running or disabled.
    pub fn start_cleanup(&self) -> bool {
        self.inner.cleanup.start(self.downgrade())
    }

    /// Stops proactive sweeps. Returns false if they were not running.
    pub fn stop_cleanup(&self) -> bool {
        self.inner.cleanup.stop()
    }

    pub fn is_cleanup_running(&self) -> bool {
        self.inner.cleanup.is_running()
    }

    // == Get ==
    /// Returns a fresh value, or None on a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = self.now();
        let (value, stats) = {
            let mut store = self.inner.store.write().await;
            let value = store.get(key, now);
            (value, store.stats_snapshot())
        };
        self.publish(stats);
        value
    }

    // == Set ==
    /// Stores a value with `ttl_ms`, or the configured TTL when None.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl_ms: Option<u64>) {
        let key = key.into();
        let now = self.now();
        let (stats, pending) = {
            let mut store = self.inner.store.write().await;
            store.set(key, value, ttl_ms, now);
            (store.stats_snapshot(), self.capture(&store, now))
        };
        self.publish(stats);
        self.commit(pending);
    }

    // == Has ==
    /// Checks for a fresh entry without counting a read or touching recency.
    pub async fn has(&self, key: &str) -> bool {
        let now = self.now();
        let (present, stats) = {
            let mut store = self.inner.store.write().await;
            let present = store.has(key, now);
            (present, store.stats_snapshot())
        };
        self.publish(stats);
        present
    }

    // == Delete ==
    /// Removes a key, returning whether it was present.
    pub async fn delete(&self, key: &str) -> bool {
        let now = self.now();
        let (removed, stats, pending) = {
            let mut store = self.inner.store.write().await;
            let removed = store.delete(key);
            let pending = if removed {
                self.capture(&store, now)
            } else {
                None
            };
            (removed, store.stats_snapshot(), pending)
        };
        self.publish(stats);
        self.commit(pending);
        removed
    }

    // == Clear ==
    /// Drops every entry and zeroes statistics, then writes the empty
    /// snapshot before returning.
    pub async fn clear(&self) {
        let now = self.now();
        let (stats, pending) = {
            let mut store = self.inner.store.write().await;
            store.clear();
            (store.stats_snapshot(), self.capture(&store, now))
        };
        self.publish(stats);
        self.write_now(pending).await;
        debug!("cache cleared");
    }

    // == Cleanup Expired ==
    /// Runs one proactive sweep, snapshotting if anything was removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.now();
        let (removed, stats, pending) = {
            let mut store = self.inner.store.write().await;
            let removed = store.cleanup_expired(now);
            let pending = if removed > 0 {
                self.capture(&store, now)
            } else {
                None
            };
            (removed, store.stats_snapshot(), pending)
        };
        self.publish(stats);
        self.commit(pending);
        removed
    }

    // == Stats ==
    pub async fn get_stats(&self) -> StatsSnapshot {
        self.inner.store.read().await.stats_snapshot()
    }

    // == Info ==
    /// Describes every entry without affecting recency or counters.
    pub async fn get_info(&self) -> CacheInfo {
        let now = self.now();
        let store = self.inner.store.read().await;
        let items = store
            .entries_in_order()
            .into_iter()
            .map(|entry| ItemInfo {
                key: entry.key.clone(),
                age: entry.age_ms(now),
                last_accessed_age: entry.idle_ms(now),
                access_count: entry.access_count,
                ttl: entry.ttl_ms,
                expires_in: entry.expires_in_ms(now),
            })
            .collect();

        CacheInfo {
            stats: store.stats_snapshot(),
            items,
            config: self.inner.config.clone(),
        }
    }

    // == Observability ==
    /// Subscribes to stats pushed after every call that changes them.
    pub fn subscribe(&self) -> StatsSubscription {
        StatsSubscription::new(self.inner.stats_tx.subscribe())
    }

    // == Memoization ==
    /// Wraps an async fallible function so successful results are cached.
    pub fn with_cache<A, F, Fut, E, G>(
        &self,
        func: F,
        key_gen: G,
        ttl_ms: Option<u64>,
    ) -> Memoized<V, F, G>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        G: Fn(&A) -> String,
    {
        Memoized::new(self.clone(), func, key_gen, ttl_ms)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakCache<V> {
        WeakCache {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // == Internals ==
    fn now(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    fn publish(&self, stats: StatsSnapshot) {
        self.inner.stats_tx.send_replace(stats);
    }

    fn capture(&self, store: &CacheStore<V>, now: u64) -> Option<PendingSnapshot> {
        self.inner.persistence.as_ref()?.capture(store, now)
    }

    /// Hands the snapshot to a background write; storage never delays the caller.
    fn commit(&self, pending: Option<PendingSnapshot>) {
        if let (Some(persistence), Some(pending)) = (&self.inner.persistence, pending) {
            persistence.spawn_commit(pending);
        }
    }

    async fn write_now(&self, pending: Option<PendingSnapshot>) {
        if let (Some(persistence), Some(pending)) = (&self.inner.persistence, pending) {
            persistence.commit(pending).await;
            persistence.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::error::Result;
    use crate::persistence::MemoryStorage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Instant;

    fn config(max_size: usize) -> CacheConfig {
        CacheConfig {
            max_size,
            ttl_ms: 300_000,
            cleanup_interval_ms: 0,
            ..CacheConfig::default()
        }
    }

    async fn saved_snapshot(storage: &MemoryStorage) -> Value {
        let raw = storage.read("farm_cache").await.unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    /// Memory storage whose writes take `delay`.
    #[derive(Debug)]
    struct SlowStorage {
        inner: MemoryStorage,
        delay: Duration,
    }

    #[async_trait]
    impl SnapshotStorage for SlowStorage {
        async fn read(&self, key: &str) -> Result<Option<String>> {
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, payload: &str) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.write(key, payload).await
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key).await
        }
    }

    fn cache_with(
        config: CacheConfig,
        storage: &Arc<MemoryStorage>,
        clock: &ManualClock,
    ) -> Cache<Value> {
        Cache::builder(config)
            .storage(storage.clone())
            .clock(clock.clone())
            .build()
    }

    #[tokio::test]
    async fn test_fresh_then_expired_read() {
        let clock = ManualClock::new(1_000);
        let cache: Cache<Value> = Cache::builder(config(100)).clock(clock.clone()).build();

        cache.set("a", json!(1), Some(1_000)).await;

        clock.advance(500);
        assert_eq!(cache.get("a").await, Some(json!(1)));
        assert_eq!(cache.get_stats().await.hits, 1);

        clock.advance(1_000);
        assert_eq!(cache.get("a").await, None);
        let stats = cache.get_stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 0);
    }

    #[tokio::test]
    async fn test_capacity_evicts_first_untouched() {
        let cache: Cache<Value> = Cache::builder(config(2)).clock(ManualClock::new(0)).build();

        cache.set("x", json!("x"), None).await;
        cache.set("y", json!("y"), None).await;
        cache.set("z", json!("z"), None).await;

        assert!(!cache.has("x").await);
        assert!(cache.has("y").await);
        assert!(cache.has("z").await);
        let stats = cache.get_stats().await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.utilization, 100.0);
    }

    #[tokio::test]
    async fn test_get_info_is_read_only() {
        let clock = ManualClock::new(0);
        let cache: Cache<Value> = Cache::builder(config(2)).clock(clock.clone()).build();

        cache.set("old", json!(1), Some(1_000)).await;
        clock.advance(10);
        cache.set("new", json!(2), None).await;
        clock.advance(200);

        let before = cache.get_stats().await;
        let info = cache.get_info().await;
        assert_eq!(cache.get_stats().await, before);

        assert_eq!(info.items.len(), 2);
        let old = &info.items[0];
        assert_eq!(old.key, "old");
        assert_eq!(old.age, 210);
        assert_eq!(old.last_accessed_age, 210);
        assert_eq!(old.access_count, 0);
        assert_eq!(old.expires_in, 790);
        assert_eq!(info.config.max_size, 2);

        // Inspection did not refresh "old", so it is still the LRU victim
        cache.set("third", json!(3), None).await;
        assert!(!cache.has("old").await);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let cache: Cache<Value> = Cache::new(config(10));

        cache.set("a", json!(1), None).await;
        cache.get("a").await;
        cache.get("missing").await;
        cache.clear().await;

        let stats = cache.get_stats().await;
        assert_eq!(stats, StatsSnapshot {
            max_size: 10,
            ..StatsSnapshot::default()
        });
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = ManualClock::new(0);

        let first = cache_with(config(10), &storage, &clock);
        first.init().await;
        first.set("short", json!("gone soon"), Some(1_000)).await;
        first.set("long", json!({"herd": 12}), Some(60_000)).await;
        clock.advance(100);
        first.get("long").await;
        first.destroy().await;
        drop(first);

        clock.advance(5_000);
        let second = cache_with(config(10), &storage, &clock);
        second.init().await;

        let info = second.get_info().await;
        assert_eq!(info.items.len(), 1);
        assert_eq!(info.items[0].key, "long");
        assert_eq!(info.items[0].access_count, 1);
        assert_eq!(info.items[0].age, 5_100);
        assert_eq!(info.stats.sets, 2);
        assert_eq!(info.stats.hits, 1);

        assert_eq!(second.get("short").await, None);
        assert_eq!(second.get("long").await, Some(json!({"herd": 12})));
    }

    #[tokio::test]
    async fn test_mutations_write_snapshots() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = ManualClock::new(0);
        let cache = cache_with(config(10), &storage, &clock);

        cache.set("a", json!(1), None).await;
        cache.flush().await;
        let saved = saved_snapshot(&storage).await;
        assert_eq!(saved["cache"].as_array().unwrap().len(), 1);

        assert!(cache.delete("a").await);
        assert!(!cache.delete("a").await);
        cache.flush().await;
        let saved = saved_snapshot(&storage).await;
        assert!(saved["cache"].as_array().unwrap().is_empty());
        assert_eq!(saved["stats"]["deletes"], 1);

        // Clear writes before returning, no flush needed
        cache.set("b", json!(2), None).await;
        cache.clear().await;
        let saved = saved_snapshot(&storage).await;
        assert!(saved["cache"].as_array().unwrap().is_empty());
        assert_eq!(saved["stats"]["sets"], 0);
    }

    #[tokio::test]
    async fn test_persistence_disabled_leaves_storage_alone() {
        let storage = Arc::new(MemoryStorage::new());
        let config = CacheConfig {
            enable_persistence: false,
            ..config(10)
        };
        let cache = cache_with(config, &storage, &ManualClock::new(0));

        cache.init().await;
        cache.set("a", json!(1), None).await;
        cache.destroy().await;

        assert!(storage.read("farm_cache").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write("farm_cache", "[[[").await.unwrap();
        let cache = cache_with(config(10), &storage, &ManualClock::new(0));

        cache.init().await;

        assert_eq!(cache.get_stats().await.size, 0);
        assert!(storage.read("farm_cache").await.unwrap().is_none());
        cache.set("a", json!(1), None).await;
        assert_eq!(cache.get("a").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_cleanup_expired_snapshots_only_when_removing() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = ManualClock::new(0);
        let cache = cache_with(config(10), &storage, &clock);

        cache.set("a", json!(1), Some(100)).await;
        cache.flush().await;
        storage.remove("farm_cache").await.unwrap();

        assert_eq!(cache.cleanup_expired().await, 0);
        cache.flush().await;
        assert!(storage.read("farm_cache").await.unwrap().is_none());

        clock.advance(101);
        assert_eq!(cache.cleanup_expired().await, 1);
        cache.flush().await;
        assert!(storage.read("farm_cache").await.unwrap().is_some());

        let stats = cache.get_stats().await;
        assert_eq!(stats.cleanups, 2);
        assert_eq!(stats.size, 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_change() {
        let cache: Cache<Value> = Cache::new(config(10));
        let mut subscription = cache.subscribe();
        assert_eq!(subscription.current().sets, 0);

        cache.set("a", json!(1), None).await;
        let stats = subscription.changed().await.unwrap();
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.size, 1);

        cache.get("a").await;
        let stats = subscription.changed().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_rate, 100.0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache: Cache<Value> = Cache::new(config(10));
        let other = cache.clone();

        cache.set("a", json!(1), None).await;
        assert_eq!(other.get("a").await, Some(json!(1)));

        let weak = cache.downgrade();
        assert!(weak.upgrade().is_some());
        drop(cache);
        drop(other);
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_lifecycle_controls_scheduler() {
        let cache: Cache<Value> = Cache::new(CacheConfig {
            cleanup_interval_ms: 60_000,
            ..config(10)
        });
        assert!(!cache.is_cleanup_running());

        cache.init().await;
        assert!(cache.is_cleanup_running());
        assert!(!cache.start_cleanup(), "second start is a no-op");

        cache.destroy().await;
        assert!(!cache.is_cleanup_running());
    }

    #[tokio::test]
    async fn test_slow_storage_does_not_stall_reads_or_writes() {
        let storage = Arc::new(SlowStorage {
            inner: MemoryStorage::new(),
            delay: Duration::from_millis(400),
        });
        let cache: Cache<Value> = Cache::builder(config(10))
            .storage(storage.clone())
            .clock(ManualClock::new(0))
            .build();

        let start = Instant::now();
        cache.set("a", json!(1), None).await;

        let writer = cache.clone();
        let set_b = tokio::spawn(async move { writer.set("b", json!(2), None).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.get("a").await, Some(json!(1)));
        set_b.await.unwrap();
        assert!(
            start.elapsed() < Duration::from_millis(200),
            "cache calls waited on the snapshot write"
        );

        cache.flush().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
        let raw = storage.read("farm_cache").await.unwrap().unwrap();
        let saved: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved["cache"].as_array().unwrap().len(), 2);
    }
}

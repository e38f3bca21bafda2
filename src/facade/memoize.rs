//! Memoization Wrapper
//!
//! Caches the successful results of an async function under a key derived
//! from its arguments. Failures are returned as-is and never cached.

use std::future::Future;

use tracing::debug;

use crate::facade::{Cache, CacheValue};

/// An async function whose `Ok` results are served from a [`Cache`].
///
/// Built with [`Cache::with_cache`]. Concurrent calls for the same key that
/// miss at the same time each invoke the function.
pub struct Memoized<V, F, G> {
    cache: Cache<V>,
    func: F,
    key_gen: G,
    ttl_ms: Option<u64>,
}

impl<V: CacheValue, F, G> Memoized<V, F, G> {
    pub fn new(cache: Cache<V>, func: F, key_gen: G, ttl_ms: Option<u64>) -> Self {
        Self {
            cache,
            func,
            key_gen,
            ttl_ms,
        }
    }

    /// Returns the cached value for `args`, or calls through and caches an `Ok`.
    pub async fn call<A, Fut, E>(&self, args: A) -> Result<V, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        G: Fn(&A) -> String,
    {
        let key = (self.key_gen)(&args);
        if let Some(value) = self.cache.get(&key).await {
            debug!(key = %key, "memoized call served from cache");
            return Ok(value);
        }

        let value = (self.func)(args).await?;
        self.cache.set(key, value.clone(), self.ttl_ms).await;
        Ok(value)
    }

    pub fn cache(&self) -> &Cache<V> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::config::CacheConfig;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn cache(clock: &ManualClock) -> Cache<Value> {
        Cache::builder(CacheConfig {
            cleanup_interval_ms: 0,
            ..CacheConfig::default()
        })
        .clock(clock.clone())
        .build()
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let clock = ManualClock::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let fetch_animal = cache(&clock).with_cache(
            move |id: u32| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(json!({ "id": id, "breed": "Nelore" }))
                }
            },
            |id: &u32| format!("animal:{id}"),
            Some(60_000),
        );

        let first = fetch_animal.call(7).await.unwrap();
        let second = fetch_animal.call(7).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetch_animal.cache().get_stats().await.hits, 1);

        fetch_animal.call(8).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let clock = ManualClock::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let fetch_weights = cache(&clock).with_cache(
            move |lot: String| {
                let counter = counter.clone();
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    if attempt == 0 {
                        Err(format!("timeout loading {lot}"))
                    } else {
                        Ok(json!([412.5, 398.0]))
                    }
                }
            },
            |lot: &String| format!("weights:{lot}"),
            None,
        );

        let err = fetch_weights.call("lot-3".to_string()).await.unwrap_err();
        assert_eq!(err, "timeout loading lot-3");
        assert!(!fetch_weights.cache().has("weights:lot-3").await);

        let value = fetch_weights.call("lot-3".to_string()).await.unwrap();
        assert_eq!(value, json!([412.5, 398.0]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        fetch_weights.call("lot-3".to_string()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_result_is_recomputed() {
        let clock = ManualClock::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let report = cache(&clock).with_cache(
            move |_: ()| {
                let counter = counter.clone();
                async move { Ok::<_, String>(json!(counter.fetch_add(1, Ordering::SeqCst))) }
            },
            |_: &()| "report:costs".to_string(),
            Some(1_000),
        );

        assert_eq!(report.call(()).await.unwrap(), json!(0));
        clock.advance(1_000);
        assert_eq!(report.call(()).await.unwrap(), json!(0));
        clock.advance(1);
        assert_eq!(report.call(()).await.unwrap(), json!(1));
    }
}

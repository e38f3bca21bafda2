//! Snapshot Persistence Module
//!
//! Serializes the store to a [`SnapshotStorage`] and restores it on startup.
//! Every failure here is logged and swallowed: the in-memory cache keeps
//! working when the durable medium does not.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStore};
use crate::persistence::SnapshotStorage;

// == Wire Format ==
/// One persisted entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord<V> {
    pub key: String,
    pub value: V,
    pub created_at: u64,
    pub last_accessed: u64,
    /// TTL in milliseconds
    pub ttl: u64,
    pub access_count: u64,
}

/// The persisted document: `{cache, stats, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<V> {
    /// Entries in insertion order
    pub cache: Vec<EntryRecord<V>>,
    pub stats: CacheStats,
    /// When the snapshot was taken (Unix milliseconds)
    pub timestamp: u64,
}

impl<V: Clone> Snapshot<V> {
    /// Copies the store's entries and counters.
    pub fn capture(store: &CacheStore<V>, now: u64) -> Self {
        let cache = store
            .entries_in_order()
            .into_iter()
            .map(|entry| EntryRecord {
                key: entry.key.clone(),
                value: entry.value.clone(),
                created_at: entry.created_at,
                last_accessed: entry.last_accessed,
                ttl: entry.ttl_ms,
                access_count: entry.access_count,
            })
            .collect();

        Self {
            cache,
            stats: store.stats().clone(),
            timestamp: now,
        }
    }
}

// == Restored ==
/// What survived a load.
#[derive(Debug)]
pub struct Restored<V> {
    /// Entries still fresh at load time, in their saved order
    pub entries: Vec<CacheEntry<V>>,
    pub stats: CacheStats,
    /// Entries discarded because they had expired
    pub dropped: usize,
    /// Timestamp recorded in the snapshot
    pub saved_at: u64,
}

/// An encoded snapshot waiting to be written.
#[derive(Debug)]
pub struct PendingSnapshot {
    generation: u64,
    payload: String,
}

// == Persistence Adapter ==
/// Reads and writes snapshots under a single storage key.
///
/// Writes are ordered by generation: a snapshot captured earlier never
/// replaces one captured later, whatever order the writes are issued in.
#[derive(Debug)]
pub struct PersistenceAdapter {
    storage: Arc<dyn SnapshotStorage>,
    key: String,
    /// Generation handed to the next captured snapshot
    next_generation: AtomicU64,
    /// Generation of the newest snapshot written, held across each write
    last_written: Mutex<u64>,
    /// Highest generation whose commit has finished, written or not
    settled: watch::Sender<u64>,
}

impl PersistenceAdapter {
    pub fn new(storage: Arc<dyn SnapshotStorage>, key: impl Into<String>) -> Self {
        let (settled, _) = watch::channel(0);
        Self {
            storage,
            key: key.into(),
            next_generation: AtomicU64::new(1),
            last_written: Mutex::new(0),
            settled,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    // == Capture ==
    /// Encodes the store for a later [`commit`](Self::commit).
    ///
    /// Call this while holding the store lock so generations follow the
    /// order of mutations. Returns None if encoding fails.
    pub fn capture<V>(&self, store: &CacheStore<V>, now: u64) -> Option<PendingSnapshot>
    where
        V: Clone + Serialize,
    {
        match serde_json::to_string(&Snapshot::capture(store, now)) {
            Ok(payload) => Some(PendingSnapshot {
                generation: self.next_generation.fetch_add(1, Ordering::SeqCst),
                payload,
            }),
            Err(e) => {
                warn!(error = %e, "failed to encode cache snapshot");
                None
            }
        }
    }

    // == Commit ==
    /// Writes a captured snapshot unless a newer one already landed.
    ///
    /// Returns true if the payload reached storage.
    pub async fn commit(&self, pending: PendingSnapshot) -> bool {
        let generation = pending.generation;
        let written = self.write_if_newest(pending).await;
        self.settled
            .send_modify(|settled| *settled = (*settled).max(generation));
        written
    }

    /// Commits on a background task so the caller does not wait on storage.
    pub fn spawn_commit(self: &Arc<Self>, pending: PendingSnapshot) -> JoinHandle<bool> {
        let adapter = Arc::clone(self);
        tokio::spawn(async move { adapter.commit(pending).await })
    }

    // == Flush ==
    /// Waits until every snapshot captured so far has been committed.
    pub async fn flush(&self) {
        let target = self.next_generation.load(Ordering::SeqCst) - 1;
        let mut settled = self.settled.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = settled.wait_for(|generation| *generation >= target).await;
    }

    async fn write_if_newest(&self, pending: PendingSnapshot) -> bool {
        let mut last_written = self.last_written.lock().await;

        if pending.generation <= *last_written {
            debug!(
                generation = pending.generation,
                newest = *last_written,
                "skipping stale cache snapshot"
            );
            return false;
        }

        match self.storage.write(&self.key, &pending.payload).await {
            Ok(()) => {
                *last_written = pending.generation;
                debug!(key = %self.key, bytes = pending.payload.len(), "cache snapshot saved");
                true
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to save cache snapshot, continuing in memory");
                false
            }
        }
    }

    // == Load ==
    /// Reads the stored snapshot, dropping entries already expired at `now`.
    ///
    /// Missing, unreadable or corrupt snapshots all yield None. A corrupt
    /// snapshot is also removed from storage.
    pub async fn load<V>(&self, now: u64) -> Option<Restored<V>>
    where
        V: DeserializeOwned,
    {
        let raw = match self.storage.read(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no cache snapshot found");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read cache snapshot, starting empty");
                return None;
            }
        };

        let snapshot: Snapshot<V> = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding corrupt cache snapshot");
                self.discard().await;
                return None;
            }
        };

        let total = snapshot.cache.len();
        let entries: Vec<CacheEntry<V>> = snapshot
            .cache
            .into_iter()
            .map(|record| CacheEntry {
                key: record.key,
                value: record.value,
                created_at: record.created_at,
                last_accessed: record.last_accessed,
                ttl_ms: record.ttl,
                access_count: record.access_count,
                seq: 0,
            })
            .filter(|entry| !entry.is_expired(now))
            .collect();

        Some(Restored {
            dropped: total - entries.len(),
            entries,
            stats: snapshot.stats,
            saved_at: snapshot.timestamp,
        })
    }

    async fn discard(&self) {
        if let Err(e) = self.storage.remove(&self.key).await {
            warn!(key = %self.key, error = %e, "failed to remove corrupt cache snapshot");
        }
    }
}

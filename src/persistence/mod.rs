//! Persistence Module
//!
//! Snapshots the cache to a durable key/value medium and restores it.

mod snapshot;
mod storage;

pub use snapshot::{EntryRecord, PendingSnapshot, PersistenceAdapter, Restored, Snapshot};
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage};

//! Stats Subscription
//!
//! Push-based view of cache statistics for dashboards and log lines.

use tokio::sync::watch;

use crate::cache::StatsSnapshot;

/// Receives a fresh [`StatsSnapshot`] after every cache call that changes it.
///
/// Intermediate values may be skipped if the subscriber is slow; the latest
/// value is always available.
#[derive(Debug, Clone)]
pub struct StatsSubscription {
    rx: watch::Receiver<StatsSnapshot>,
}

impl StatsSubscription {
    pub(crate) fn new(rx: watch::Receiver<StatsSnapshot>) -> Self {
        Self { rx }
    }

    /// Latest published stats.
    pub fn current(&self) -> StatsSnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next change. Returns None once the cache is gone.
    pub async fn changed(&mut self) -> Option<StatsSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

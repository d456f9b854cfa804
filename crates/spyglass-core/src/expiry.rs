//! Time-based auto-clear of old entries.

use crate::entry::now_millis;
use crate::store::EventStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Upper bound on the time between two sweeps.
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Handle to a running auto-clear task. The task stops when the handle is dropped.
#[derive(Debug)]
pub struct AutoClearHandle {
    task: JoinHandle<()>,
}

impl AutoClearHandle {
    /// Stop the sweep.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Check if the sweep task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AutoClearHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Sweep period for a given retention age.
pub fn sweep_interval(max_age: Duration) -> Duration {
    let floor = Duration::from_millis(1);
    max_age.min(MAX_SWEEP_INTERVAL).max(floor)
}

/// Evict everything older than `max_age` once.
///
/// Returns the number of entries removed.
pub fn sweep(store: &EventStore, max_age: Duration) -> usize {
    let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
    let cutoff = now_millis().saturating_sub(max_age_ms);
    let evicted = store.evict_older_than(cutoff);
    tracing::debug!(evicted, cutoff, "Auto-clear sweep finished");
    evicted
}

/// Spawn a periodic sweep on the current tokio runtime.
///
/// Must be called from within a runtime.
pub fn spawn_auto_clear(store: Arc<EventStore>, max_age: Duration) -> AutoClearHandle {
    let period = sweep_interval(max_age);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick finishes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep(&store, max_age);
        }
    });

    AutoClearHandle { task }
}

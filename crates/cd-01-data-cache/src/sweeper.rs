//! Background expiry sweep.
//!
//! Reclaims expired entries on a fixed interval, independent of reads and
//! writes. The task holds only a `Weak` reference, so it never keeps a
//! dropped cache alive.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::service::DataCache;

/// Handle to a running sweeper. Dropping it stops the task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Spawn the sweep task using the cache's configured interval.
///
/// Must be called from within a tokio runtime.
pub fn start_sweeper(cache: &Arc<DataCache>) -> SweeperHandle {
    start_sweeper_with_interval(cache, cache.config().sweep_interval)
}

/// Shortest sweep period; shorter requests are raised to it.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn the sweep task with an explicit interval, at least
/// `MIN_SWEEP_INTERVAL`.
pub fn start_sweeper_with_interval(cache: &Arc<DataCache>, period: Duration) -> SweeperHandle {
    let period = period.max(MIN_SWEEP_INTERVAL);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(sweep_loop(Arc::downgrade(cache), period, shutdown_rx));
    info!(interval_ms = period.as_millis() as u64, "Cache sweeper started");
    SweeperHandle {
        shutdown_tx,
        task: Some(task),
    }
}

async fn sweep_loop(cache: Weak<DataCache>, period: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(cache) = cache.upgrade() else {
                    debug!("Cache dropped, sweeper exiting");
                    return;
                };
                let removed = cache.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "Sweeper reclaimed expired entries");
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("Cache sweeper stopped");
                    return;
                }
            }
        }
    }
}

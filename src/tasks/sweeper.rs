//! Background Sweep Task
//!
//! Periodically removes expired cache entries until told to stop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{CacheError, Result};

/// Spawns a task that calls `sweep` every `interval` until shutdown.
///
/// The task waits on two things: the next tick and the shutdown signal. The
/// first tick fires one full interval after spawn. A zero interval starts a
/// task that never sweeps and only waits for shutdown. Dropping the sender
/// also stops the task.
///
/// # Arguments
/// * `interval` - Time between sweep passes
/// * `shutdown_rx` - Receiver that flips to `true` on shutdown
/// * `sweep` - Sweep pass returning the number of entries removed
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tokio::sync::watch;
/// use ttl_cache::tasks::spawn_sweep_task;
///
/// # #[tokio::main]
/// # async fn main() {
/// let passes = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&passes);
///
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = spawn_sweep_task(Duration::from_millis(10), shutdown_rx, move || {
///     counter.fetch_add(1, Ordering::Relaxed);
///     0
/// });
///
/// // Later:
/// shutdown_tx.send_replace(true);
/// handle.await.unwrap();
/// # }
/// ```
pub fn spawn_sweep_task<F>(
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    sweep: F,
) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        if interval.is_zero() {
            info!("Sweep interval is zero, background sweep disabled");
            wait_for_shutdown(&mut shutdown_rx).await;
            info!("Background sweep task stopped");
            return;
        }

        info!("Starting background sweep task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = sweep();
                    if removed > 0 {
                        info!("Background sweep: removed {} expired entries", removed);
                    } else {
                        debug!("Background sweep: no expired entries found");
                    }
                }
                _ = wait_for_shutdown(&mut shutdown_rx) => break,
            }
        }

        info!("Background sweep task stopped");
    })
}

async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    // Err means the sender is gone, which is a shutdown as well
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

// == Sweeper ==
/// Owns a running sweep task and its one-shot stop signal.
///
/// Stopping is idempotent, and dropping the sweeper stops the task.
#[derive(Debug)]
pub struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns a sweep task on the current Tokio runtime.
    ///
    /// Returns `CacheError::RuntimeUnavailable` when called outside a runtime.
    pub fn spawn<F>(interval: Duration, sweep: F) -> Result<Self>
    where
        F: Fn() -> usize + Send + 'static,
    {
        if let Err(e) = tokio::runtime::Handle::try_current() {
            return Err(CacheError::RuntimeUnavailable(e.to_string()));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_sweep_task(interval, shutdown_rx, sweep);

        Ok(Self {
            shutdown_tx,
            handle,
        })
    }

    /// Signals the task to stop.
    ///
    /// Returns true if this call performed the transition, false if the
    /// sweeper had already been stopped.
    pub fn stop(&self) -> bool {
        let already_stopped = self.shutdown_tx.send_replace(true);
        !already_stopped
    }

    /// Returns true until the stop signal is sent and while the task is alive.
    pub fn is_running(&self) -> bool {
        !*self.shutdown_tx.borrow() && !self.handle.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

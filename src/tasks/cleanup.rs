//! TTL Cleanup Task
//!
//! Background reaper that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

// == Sweep ==
/// A store the reaper can sweep.
pub trait Sweep: Send + Sync {
    /// Removes every currently expired entry, returning how many were removed.
    fn sweep(&self) -> usize;
}

/// How a reaper ended during `Reaper::stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The task observed the stop signal and exited on its own
    Graceful,
    /// The task did not exit within the timeout and was aborted
    Aborted,
}

// == Reaper ==
/// Handle to a running cleanup task.
///
/// Dropping the handle closes the stop channel, which also ends the task
/// the next time it is scheduled.
#[derive(Debug)]
pub struct Reaper {
    handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

impl Reaper {
    /// Signals the task to stop and waits up to `timeout` for it to exit,
    /// aborting it otherwise.
    ///
    /// A sweep already in progress runs to completion; no new sweep starts
    /// after the signal. Aborting only detaches the task from a running
    /// sweep, which still finishes on the blocking pool.
    ///
    /// # Arguments
    /// * `timeout` - How long to wait for a graceful exit
    ///
    /// # Returns
    /// Whether the task exited on its own or had to be aborted.
    pub async fn stop(self, timeout: Duration) -> StopOutcome {
        let Reaper {
            mut handle,
            stop_tx,
        } = self;
        let _ = stop_tx.send(true);

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(_) => {
                info!("TTL cleanup task stopped");
                StopOutcome::Graceful
            }
            Err(_) => {
                handle.abort();
                warn!("TTL cleanup task did not stop within {:?}, aborted", timeout);
                StopOutcome::Aborted
            }
        }
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns a background task on `runtime` that sweeps `target` every
/// `interval`.
///
/// The first sweep happens one interval after spawning. Each sweep runs on
/// Tokio's blocking pool so a large store never stalls the runtime's
/// workers. A sweep that panics is logged and the schedule continues.
///
/// # Arguments
/// * `runtime` - Runtime the task is spawned on
/// * `target` - Store to sweep
/// * `interval` - Time between sweeps, must be non-zero
///
/// # Returns
/// A `Reaper` handle used to stop the task.
///
/// # Example
/// ```ignore
/// let reaper = spawn_cleanup_task(&Handle::current(), store, Duration::from_secs(60));
/// // Later, during shutdown:
/// reaper.stop(Duration::from_secs(5)).await;
/// ```
pub fn spawn_cleanup_task(
    runtime: &Handle,
    target: Arc<dyn Sweep>,
    interval: Duration,
) -> Reaper {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let handle = runtime.spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                // Fires on the stop signal and when the sender is dropped
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let sweep_target = Arc::clone(&target);
            match tokio::task::spawn_blocking(move || sweep_target.sweep()).await {
                Ok(0) => debug!("TTL cleanup: no expired entries found"),
                Ok(removed) => info!("TTL cleanup: removed {} expired entries", removed),
                Err(e) if e.is_panic() => {
                    error!("TTL cleanup sweep panicked, continuing on schedule")
                }
                Err(e) => error!("TTL cleanup sweep did not complete: {}", e),
            }
        }

        debug!("TTL cleanup task exiting");
    });

    Reaper { handle, stop_tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts sweeps and optionally misbehaves on chosen ones.
    #[derive(Default)]
    struct CountingSweep {
        calls: AtomicUsize,
        panic_on_first: bool,
        block_for: Option<Duration>,
    }

    impl Sweep for CountingSweep {
        fn sweep(&self) -> usize {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_first && call == 0 {
                panic!("sweep failure");
            }
            if let Some(block) = self.block_for {
                std::thread::sleep(block);
            }
            call
        }
    }

    fn spawn(target: &Arc<CountingSweep>, interval: Duration) -> Reaper {
        spawn_cleanup_task(&Handle::current(), target.clone(), interval)
    }

    #[tokio::test]
    async fn test_cleanup_task_sweeps_on_interval() {
        let target = Arc::new(CountingSweep::default());

        let reaper = spawn(&target, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(target.calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(
            reaper.stop(Duration::from_secs(1)).await,
            StopOutcome::Graceful
        );
    }

    #[tokio::test]
    async fn test_cleanup_task_does_not_sweep_immediately() {
        let target = Arc::new(CountingSweep::default());

        let reaper = spawn(&target, Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(target.calls.load(Ordering::SeqCst), 0);
        reaper.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_cleanup_task_survives_panicking_sweep() {
        let target = Arc::new(CountingSweep {
            panic_on_first: true,
            ..Default::default()
        });

        let reaper = spawn(&target, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!reaper.is_finished(), "Task should outlive a failed sweep");
        assert!(target.calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(
            reaper.stop(Duration::from_secs(1)).await,
            StopOutcome::Graceful
        );
    }

    #[tokio::test]
    async fn test_no_sweep_after_stop() {
        let target = Arc::new(CountingSweep::default());

        let reaper = spawn(&target, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(35)).await;
        reaper.stop(Duration::from_secs(1)).await;

        let after_stop = target.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(target.calls.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_dropping_reaper_ends_task() {
        let target = Arc::new(CountingSweep::default());

        let reaper = spawn(&target, Duration::from_millis(10));
        drop(reaper);
        tokio::time::sleep(Duration::from_millis(30)).await;

        let after_drop = target.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(target.calls.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn test_slow_sweep_does_not_stall_runtime() {
        let target = Arc::new(CountingSweep {
            block_for: Some(Duration::from_millis(300)),
            ..Default::default()
        });

        let reaper = spawn(&target, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(target.calls.load(Ordering::SeqCst), 1);

        // Single-threaded runtime keeps serving timers while the sweep blocks
        let started = std::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_millis(200));

        reaper.stop(Duration::from_secs(2)).await;
    }

    #[tokio::test]
    async fn test_stop_aborts_after_timeout() {
        let target = Arc::new(CountingSweep {
            block_for: Some(Duration::from_millis(500)),
            ..Default::default()
        });

        let reaper = spawn(&target, Duration::from_millis(10));
        // Let the first sweep start
        tokio::time::sleep(Duration::from_millis(50)).await;

        let outcome = reaper.stop(Duration::from_millis(50)).await;
        assert_eq!(outcome, StopOutcome::Aborted);
    }
}

//! Background sweeper task and its lifecycle handle.
//!
//! The sweeper wakes on a fixed-period timer and runs a sweep pass. It stops
//! when its cancellation token fires, regardless of where it is in the
//! timer period. A stopped sweeper cannot be restarted.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Handle to a running sweeper task.
///
/// Dropping the handle signals the sweeper to stop but does not wait for it.
/// Use [`SweeperHandle::join`] to wait for the task to exit.
#[derive(Debug)]
pub(crate) struct SweeperHandle {
    /// Cancelled to ask the task to stop.
    token: CancellationToken,

    /// Cancelled by the task itself once it has exited, including on panic.
    exited: CancellationToken,

    join: Mutex<Option<JoinHandle<()>>>,
}

impl SweeperHandle {
    /// Spawn a sweeper on the current tokio runtime.
    ///
    /// `sweep` runs once per `interval`, first one full interval after spawn.
    pub(crate) fn spawn<F>(interval: Duration, sweep: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if interval.is_zero() {
            return Err(Error::InvalidInterval);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let token = CancellationToken::new();
        let exited = CancellationToken::new();
        let task_token = token.clone();
        let exit_guard = exited.clone().drop_guard();
        let join = runtime.spawn(async move {
            let _exit_guard = exit_guard;
            let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
            debug!(interval_ms = interval_ms, "Sweeper started");
            run(interval, task_token, sweep).await;
            debug!("Sweeper stopped");
        });

        Ok(Self {
            token,
            exited,
            join: Mutex::new(Some(join)),
        })
    }

    /// Check if the sweeper task is still running.
    pub(crate) fn is_running(&self) -> bool {
        !self.exited.is_cancelled()
    }

    /// Signal the sweeper to stop and wait for the task to exit.
    ///
    /// Every caller waits until the task has exited, however many join at once.
    pub(crate) async fn join(&self) {
        self.token.cancel();
        self.exited.cancelled().await;

        let handle = self.join.lock().take();
        let Some(handle) = handle else {
            return;
        };
        if let Err(e) = handle.await
            && e.is_panic()
        {
            warn!(error = %e, "Sweeper task panicked");
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run<F: Fn()>(interval: Duration, token: CancellationToken, sweep: F) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => sweep(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counting_sweeper(interval: Duration) -> (SweeperHandle, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = Arc::clone(&count);
        let handle = SweeperHandle::spawn(interval, move || {
            task_count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        (handle, count)
    }

    #[tokio::test]
    async fn test_sweeps_on_each_tick() {
        let (handle, count) = counting_sweeper(Duration::from_millis(20));

        sleep(Duration::from_millis(150)).await;

        assert!(count.load(Ordering::SeqCst) >= 2);
        handle.join().await;
    }

    #[tokio::test]
    async fn test_first_sweep_after_one_interval() {
        let (handle, count) = counting_sweeper(Duration::from_secs(60));

        sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        handle.join().await;
    }

    #[tokio::test]
    async fn test_join_stops_task() {
        let (handle, count) = counting_sweeper(Duration::from_millis(20));
        assert!(handle.is_running());

        handle.join().await;
        assert!(!handle.is_running());

        let after_stop = count.load(Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let (handle, _) = counting_sweeper(Duration::from_millis(20));
        handle.join().await;
        handle.join().await;
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_stop_does_not_wait_for_tick() {
        let (handle, _) = counting_sweeper(Duration::from_secs(3600));

        let started = std::time::Instant::now();
        handle.join().await;

        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_joins_wait_for_exit() {
        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (task_started, task_finished) = (Arc::clone(&started), Arc::clone(&finished));
        let handle = Arc::new(
            SweeperHandle::spawn(Duration::from_millis(10), move || {
                task_started.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(400));
                task_finished.store(true, Ordering::SeqCst);
            })
            .unwrap(),
        );

        while !started.load(Ordering::SeqCst) {
            sleep(Duration::from_millis(5)).await;
        }

        let first = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.join().await })
        };
        sleep(Duration::from_millis(50)).await;

        // The first join is still waiting on the slow sweep.
        assert!(handle.is_running());

        handle.join().await;
        assert!(finished.load(Ordering::SeqCst));
        assert!(!handle.is_running());

        first.await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_sweep_counts_as_exited() {
        let handle =
            SweeperHandle::spawn(Duration::from_millis(10), || panic!("sweep failed")).unwrap();

        sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_running());

        handle.join().await;
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let result = SweeperHandle::spawn(Duration::ZERO, || {});
        assert!(matches!(result, Err(Error::InvalidInterval)));
    }

    #[test]
    fn test_spawn_requires_runtime() {
        let result = SweeperHandle::spawn(Duration::from_secs(1), || {});
        assert!(matches!(result, Err(Error::NoRuntime)));
    }
}

//! Restartable periodic timer built on cooperative cancellation.
//!
//! [`PeriodicTimer`] spawns poll loops that sleep for the configured interval
//! and then invoke an async callback, repeating until cancelled. The interval
//! can be changed while jobs are running; each job reads it fresh before every
//! sleep, so a change takes effect at the next sleep, never the current one.
//!
//! Every [`start`](PeriodicTimer::start) call produces an independent job with
//! its own [`TimerHandle`]; cancelling one job never affects the others.
//! [`stop_all`](PeriodicTimer::stop_all) cancels every job started from one
//! timer instance (via child tokens of a shared root) and leaves the timer
//! usable for new jobs afterwards.
//!
//! Cancellation is observed at the next wake-up at the latest. A callback
//! invocation that is already in progress is never interrupted mid-flight.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default interval between callback invocations.
pub const DEFAULT_TIMER_INTERVAL_SECS: u64 = 60;

/// Spawns independent, individually cancellable periodic jobs.
pub struct PeriodicTimer {
    /// Interval in milliseconds, read fresh by every job before each sleep.
    interval_ms: Arc<AtomicU64>,
    /// Root token; jobs run on child tokens so they stay independently
    /// cancellable while `stop_all` can still reach all of them.
    root: Mutex<CancellationToken>,
}

impl PeriodicTimer {
    /// Timer with the default interval of [`DEFAULT_TIMER_INTERVAL_SECS`].
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(DEFAULT_TIMER_INTERVAL_SECS))
    }

    /// Timer with a specific initial interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval_ms: Arc::new(AtomicU64::new(interval.as_millis() as u64)),
            root: Mutex::new(CancellationToken::new()),
        }
    }

    /// Change the interval for all jobs of this timer.
    ///
    /// Takes effect when each job next starts sleeping; a sleep already in
    /// progress finishes with the old interval.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    /// The currently configured interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// Start a periodic job: sleep the current interval, invoke `callback`,
    /// repeat until the returned handle (or `stop_all`) cancels it.
    pub fn start<F, Fut>(&self, mut callback: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let token = self.root.lock().unwrap().child_token();
        let loop_token = token.clone();
        let interval_ms = Arc::clone(&self.interval_ms);

        let join = tokio::spawn(async move {
            loop {
                let interval = Duration::from_millis(interval_ms.load(Ordering::Relaxed));
                tokio::select! {
                    biased;

                    _ = loop_token.cancelled() => {
                        debug!("Periodic job cancelled");
                        break;
                    }

                    _ = tokio::time::sleep(interval) => {}
                }

                // Runs to completion even if cancellation arrives meanwhile;
                // the loop observes it at the next wake-up.
                callback().await;
            }
        });

        TimerHandle { token, join }
    }

    /// Cancel every job started from this timer.
    ///
    /// The timer stays usable: jobs started afterwards run on a fresh root.
    pub fn stop_all(&self) {
        let mut root = self.root.lock().unwrap();
        root.cancel();
        *root = CancellationToken::new();
    }
}

impl Default for PeriodicTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one running periodic job.
pub struct TimerHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl TimerHandle {
    /// Request cancellation; the job stops at its next wake-up at the latest.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the job's loop to exit.
    pub async fn cancel_and_join(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

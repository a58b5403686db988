//! Background expiry sweep for SessionWard.
//!
//! The reaper is a single Tokio task bound to one [`SessionStore`]. Once per
//! poll interval it takes the store's lock, evicts every session idle for
//! longer than the timeout, releases the lock and sleeps again.
//!
//! # Eviction latency
//!
//! A session is expired once `now - last_active > timeout`. Because scans
//! happen every `poll_interval`, a session idle since `T0` is removed at
//! some point in `(T0 + timeout, T0 + timeout + poll_interval]`. Keep
//! `timeout` at least 20× the poll interval so that window stays tight
//! relative to the timeout.
//!
//! # Stopping
//!
//! [`Reaper::spawn`] returns a [`ReaperHandle`]. Call
//! [`ReaperHandle::stop`] to stop the task and collect its metrics, or just
//! drop the handle: the task notices the closed stop channel and exits.
//!
//! ```ignore
//! let store = Arc::new(SessionStore::new());
//! let reaper = Reaper::spawn(Arc::clone(&store), ReaperConfig::default());
//! // ... serve requests ...
//! let metrics = reaper.stop().await?;
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sessionward_session::SessionStore;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How often the reaper scans and how long a session may stay idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Delay between two scans. Default: 250 ms.
    pub poll_interval: Duration,
    /// Inactivity after which a session is eligible for eviction.
    /// Default: 5 s.
    pub timeout: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            timeout: Duration::from_secs(5),
        }
    }
}

impl ReaperConfig {
    /// Shortest accepted poll interval. A zero period would spin.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Recommended minimum ratio of `timeout` to `poll_interval`.
    pub const RECOMMENDED_TIMEOUT_FACTOR: u32 = 20;

    /// Create a config from both durations.
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the inactivity timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Clamp out-of-range values so the config is safe to run.
    ///
    /// Called automatically by [`Reaper::spawn`]. Rules:
    /// - `poll_interval` raised to at least [`Self::MIN_POLL_INTERVAL`].
    /// - `timeout` raised to `poll_interval + MIN_POLL_INTERVAL` when it does
    ///   not exceed `poll_interval` (saturating at `Duration::MAX`).
    /// - A warning (no change) when `timeout` is below
    ///   [`Self::RECOMMENDED_TIMEOUT_FACTOR`] × `poll_interval`.
    ///
    /// Never panics, whatever the durations.
    pub fn validated(mut self) -> Self {
        if self.poll_interval < Self::MIN_POLL_INTERVAL {
            warn!(
                poll_interval_ms = self.poll_interval.as_secs_f64() * 1000.0,
                "poll_interval below minimum, clamping"
            );
            self.poll_interval = Self::MIN_POLL_INTERVAL;
        }
        if self.timeout <= self.poll_interval {
            let clamped = self.poll_interval.saturating_add(Self::MIN_POLL_INTERVAL);
            warn!(
                timeout_ms = self.timeout.as_secs_f64() * 1000.0,
                poll_interval_ms = self.poll_interval.as_secs_f64() * 1000.0,
                clamped_ms = clamped.as_secs_f64() * 1000.0,
                "timeout does not exceed poll_interval, clamping"
            );
            self.timeout = clamped;
        }
        // An overflowing product exceeds every representable timeout.
        let recommended = self
            .poll_interval
            .checked_mul(Self::RECOMMENDED_TIMEOUT_FACTOR);
        if recommended.map_or(true, |min| self.timeout < min) {
            warn!(
                timeout_ms = self.timeout.as_secs_f64() * 1000.0,
                poll_interval_ms = self.poll_interval.as_secs_f64() * 1000.0,
                factor = Self::RECOMMENDED_TIMEOUT_FACTOR,
                "timeout is less than the recommended multiple of poll_interval"
            );
        }
        self
    }

    /// Latest point after the last update at which a session is gone.
    /// Saturates at `Duration::MAX`.
    pub fn max_eviction_latency(&self) -> Duration {
        self.timeout.saturating_add(self.poll_interval)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the reaper. Updated after every scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaperMetrics {
    /// Scans completed.
    pub total_scans: u64,
    /// Sessions evicted across all scans.
    pub total_evicted: u64,
    /// Wall-clock duration of the most recent scan, lock wait included.
    pub last_scan: Duration,
    /// Longest scan observed.
    pub max_scan: Duration,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a reaper task did not stop cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    /// The task panicked. Sessions stopped expiring at that point.
    #[error("reaper task panicked: {0}")]
    Panicked(String),

    /// The task was cancelled by the runtime (e.g. runtime shutdown).
    #[error("reaper task was cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Reaper
// ---------------------------------------------------------------------------

/// The expiry sweep task. Construct it with [`Reaper::spawn`].
pub struct Reaper {
    store: Arc<SessionStore>,
    config: ReaperConfig,
    metrics: watch::Sender<ReaperMetrics>,
    #[cfg(test)]
    panic_on_scan: bool,
}

/// Logs at `error` if the reaper task unwinds.
///
/// Dropped at the end of [`Reaper::run`], so a panic is reported when it
/// happens rather than when somebody eventually stops the reaper.
struct CrashReport;

impl Drop for CrashReport {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("reaper task panicked; sessions are no longer expiring");
        }
    }
}

impl Reaper {
    /// Spawn the sweep on the current Tokio runtime.
    ///
    /// The first scan runs immediately, then one every `poll_interval`.
    ///
    /// # Panics
    /// If called outside a Tokio runtime.
    pub fn spawn(store: Arc<SessionStore>, config: ReaperConfig) -> ReaperHandle {
        let (reaper, metrics_rx) = Self::new(store, config);
        reaper.start(metrics_rx)
    }

    fn new(
        store: Arc<SessionStore>,
        config: ReaperConfig,
    ) -> (Self, watch::Receiver<ReaperMetrics>) {
        let (metrics_tx, metrics_rx) = watch::channel(ReaperMetrics::default());
        let reaper = Self {
            store,
            config: config.validated(),
            metrics: metrics_tx,
            #[cfg(test)]
            panic_on_scan: false,
        };
        (reaper, metrics_rx)
    }

    fn start(self, metrics: watch::Receiver<ReaperMetrics>) -> ReaperHandle {
        let config = self.config;
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(stop_rx));

        ReaperHandle {
            config,
            stop: stop_tx,
            task,
            metrics,
        }
    }

    async fn run(self, mut stop: oneshot::Receiver<()>) {
        let _crash = CrashReport;
        debug!(
            poll_interval_ms = self.config.poll_interval.as_secs_f64() * 1000.0,
            timeout_ms = self.config.timeout.as_secs_f64() * 1000.0,
            "reaper started"
        );

        let mut ticker = time::interval(self.config.poll_interval);
        // After a stall, resume the normal cadence instead of bursting scans.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                // Fires on an explicit stop and when the handle is dropped.
                _ = &mut stop => break,
                _ = ticker.tick() => self.scan().await,
            }
        }

        let metrics = self.metrics.borrow().clone();
        debug!(
            total_scans = metrics.total_scans,
            total_evicted = metrics.total_evicted,
            "reaper stopped"
        );
    }

    async fn scan(&self) {
        #[cfg(test)]
        if self.panic_on_scan {
            panic!("scan failed");
        }

        let started = Instant::now();
        let evicted = self.store.evict_expired(self.config.timeout).await;
        let elapsed = started.elapsed();

        if evicted.is_empty() {
            trace!("reaper scan found nothing to evict");
        } else {
            debug!(evicted = evicted.len(), "reaper evicted expired sessions");
            for session_id in &evicted {
                trace!(%session_id, "session expired");
            }
        }

        self.metrics.send_modify(|m| {
            m.total_scans += 1;
            m.total_evicted += evicted.len() as u64;
            m.last_scan = elapsed;
            if elapsed > m.max_scan {
                m.max_scan = elapsed;
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner's handle to a running reaper.
///
/// Dropping it stops the task at its next wake-up.
pub struct ReaperHandle {
    config: ReaperConfig,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
    metrics: watch::Receiver<ReaperMetrics>,
}

impl ReaperHandle {
    /// Stop the task, wait for it to exit and return its final metrics.
    ///
    /// A scan already in progress finishes first.
    ///
    /// # Errors
    /// [`ReaperError::Panicked`] if the task had crashed, or
    /// [`ReaperError::Cancelled`] if the runtime cancelled it.
    pub async fn stop(self) -> Result<ReaperMetrics, ReaperError> {
        // The task may already be gone; that shows up in the join result.
        let _ = self.stop.send(());

        match self.task.await {
            Ok(()) => Ok(self.metrics.borrow().clone()),
            Err(e) if e.is_panic() => Err(ReaperError::Panicked(panic_message(e.into_panic()))),
            Err(_) => Err(ReaperError::Cancelled),
        }
    }

    /// Snapshot of the current metrics.
    pub fn metrics(&self) -> ReaperMetrics {
        self.metrics.borrow().clone()
    }

    /// The validated config the task runs with.
    pub fn config(&self) -> ReaperConfig {
        self.config
    }

    /// Whether the task has exited (stopped or crashed).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Whether the task is still sweeping. `false` once it has crashed,
    /// which means sessions no longer expire.
    pub fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

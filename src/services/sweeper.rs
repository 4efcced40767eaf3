//! Фоновая очистка просроченных броней.
//!
//! The sweeper knows nothing about storage: it only drives an
//! [`ExpiredBooksCleaner`] on a fixed schedule until shutdown is signalled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::ServiceError;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_TICK_TIMEOUT: Duration = Duration::from_secs(5);

/// The single capability the sweeper needs.
pub trait ExpiredBooksCleaner: Send + Sync + 'static {
    /// Runs one full sweep and returns how many bookings were removed.
    fn clean_expired_books(&self) -> impl Future<Output = Result<usize, ServiceError>> + Send;
}

pub struct ExpirySweeper<C> {
    cleaner: Arc<C>,
    interval: Duration,
    tick_timeout: Duration,
}

impl<C: ExpiredBooksCleaner> ExpirySweeper<C> {
    /// Non-positive intervals fall back to [`DEFAULT_SWEEP_INTERVAL`].
    pub fn new(cleaner: Arc<C>, interval_secs: i64, tick_timeout: Duration) -> Self {
        let interval = match u64::try_from(interval_secs) {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    interval_secs,
                    default_secs = DEFAULT_SWEEP_INTERVAL.as_secs(),
                    "invalid sweep interval, using default"
                );
                DEFAULT_SWEEP_INTERVAL
            }
        };
        Self {
            cleaner,
            interval,
            tick_timeout,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Ticks every `interval` until `shutdown` flips to `true` or its sender
    /// goes away. A tick in progress is finished first; ticks never overlap.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "🧹 expiry sweeper started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }

        info!("🧹 expiry sweeper stopped");
    }

    /// One bounded sweep. Failures are logged and left for the next tick.
    pub async fn run_once(&self) -> Option<usize> {
        match time::timeout(self.tick_timeout, self.cleaner.clean_expired_books()).await {
            Ok(Ok(cleaned)) => {
                debug!(cleaned, "sweep finished");
                Some(cleaned)
            }
            Ok(Err(err)) => {
                error!(error = %err, "failed to clean expired bookings");
                None
            }
            Err(_) => {
                error!(timeout_secs = self.tick_timeout.as_secs(), "sweep timed out, rolled back");
                None
            }
        }
    }
}

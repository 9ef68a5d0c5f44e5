use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::services::store::LocationStore;

/// Locations older than this many seconds are purged (two days)
pub const DEFAULT_MAX_AGE_SECS: i64 = 172_800;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// When locations expire and how often to look for them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionPolicy {
    pub max_age_secs: i64,
    /// Delay before the first periodic sweep
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetentionPolicy {
    /// Strictly older than the maximum age
    pub fn is_expired(&self, created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - created).num_seconds() > self.max_age_secs
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub expired: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Deletes expired locations from the store
#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn LocationStore>,
    policy: RetentionPolicy,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn LocationStore>, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// One pass over the collection. A failed listing or delete is logged and
    /// skipped; the next scheduled pass picks up whatever is left.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let locations = match self.store.list().await {
            Ok(locations) => locations,
            Err(e) => {
                warn!("Retention sweep could not list locations: {}", e);
                return report;
            }
        };

        for location in locations {
            report.examined += 1;
            if !self.policy.is_expired(location.timestamp, now) {
                continue;
            }
            report.expired += 1;

            match self.store.delete_by_name(&location.name).await {
                Ok(_) => {
                    debug!(
                        "Purged location {:?} ({}s old)",
                        location.name,
                        location.age_seconds(now)
                    );
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!("Failed to purge location {:?}: {}", location.name, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Retention sweep done: {} examined, {} expired, {} deleted, {} failed",
            report.examined, report.expired, report.deleted, report.failed
        );
        report
    }

    /// Sweep once now, then on every tick of the policy's schedule. Runs
    /// until the task is aborted.
    pub async fn run(self) {
        self.sweep().await;

        let start = Instant::now() + self.policy.initial_delay;
        let mut ticker = interval_at(start, self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }
}

/// Owns the background sweep task. At most one is scheduled at a time.
#[derive(Default)]
pub struct SweepSchedule {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SweepSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any running schedule, then spawn `sweeper` on the runtime
    pub fn start(&self, sweeper: RetentionSweeper) {
        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            debug!("Cancelling previous retention schedule");
            previous.abort();
        }

        info!(
            "Scheduling retention sweeps every {:?} (first periodic run in {:?})",
            sweeper.policy.interval, sweeper.policy.initial_delay
        );
        *task = Some(tokio::spawn(sweeper.run()));
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            info!("Stopping retention sweeps");
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SweepSchedule {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

//! Retention sweeper: periodic removal of expired durable rows and stale
//! session index entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use warden_core::config::SessionConfig;

use crate::store::TokenRepository;

/// What one sweep cycle removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired refresh records deleted.
    pub refresh_removed: u64,
    /// Expired blacklist entries deleted.
    pub blacklist_removed: u64,
    /// Stale session index entries pruned.
    pub orphans_removed: usize,
    /// Sub-sweeps that failed this cycle.
    pub failures: usize,
}

/// Runs the three retention sweeps on a fixed interval.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    tokens: Arc<TokenRepository>,
    interval: Duration,
    cycle_timeout: Duration,
}

impl RetentionSweeper {
    /// Creates a sweeper using the configured interval and cycle timeout.
    pub fn new(tokens: Arc<TokenRepository>, config: &SessionConfig) -> Self {
        Self::with_timing(tokens, config.sweeper_interval(), config.sweeper_timeout())
    }

    /// Creates a sweeper with explicit timing.
    pub fn with_timing(
        tokens: Arc<TokenRepository>,
        interval: Duration,
        cycle_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            interval,
            cycle_timeout,
        }
    }

    /// Run one cycle now. Each sub-sweep runs regardless of the others.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.tokens.sweep_expired_refresh().await {
            Ok(rows) => report.refresh_removed = rows,
            Err(e) => {
                error!(error = %e, "Failed to sweep expired refresh tokens");
                report.failures += 1;
            }
        }

        match self.tokens.sweep_expired_blacklist().await {
            Ok(rows) => report.blacklist_removed = rows,
            Err(e) => {
                error!(error = %e, "Failed to sweep expired blacklist entries");
                report.failures += 1;
            }
        }

        match self.tokens.sweep_orphans().await {
            Ok(sweep) => report.orphans_removed = sweep.entries_removed,
            Err(e) => {
                error!(error = %e, "Failed to sweep orphaned session index entries");
                report.failures += 1;
            }
        }

        report
    }

    /// Start the sweeper on its own task. The first cycle runs one full
    /// interval after spawning.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown, cancel) = watch::channel(false);
        let task = tokio::spawn(self.run(cancel));
        SweeperHandle { shutdown, task }
    }

    async fn run(self, mut cancel: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.cycle_timeout.as_secs(),
            "Retention sweeper started"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match time::timeout(self.cycle_timeout, self.run_once()).await {
                        Ok(report) if report.failures > 0 => {
                            warn!(failures = report.failures, "Retention sweep finished with failures");
                        }
                        Ok(report) => {
                            debug!(
                                refresh_removed = report.refresh_removed,
                                blacklist_removed = report.blacklist_removed,
                                orphans_removed = report.orphans_removed,
                                "Retention sweep completed"
                            );
                        }
                        Err(_) => {
                            warn!(
                                timeout_secs = self.cycle_timeout.as_secs(),
                                "Retention sweep timed out"
                            );
                        }
                    }
                }
            }
        }

        info!("Retention sweeper stopped");
    }
}

/// Owner of a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Retention sweeper task failed");
        }
    }

    /// Whether the sweeper task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

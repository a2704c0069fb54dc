//! Session management configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::MAX_LIFETIME;
use crate::error::AppError;

/// Session timeouts and retention sweeper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a session is rejected on its next use.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_minutes: u64,
    /// Lifetime of a session's ephemeral claims, measured from login.
    /// Activity does not extend it.
    #[serde(default = "default_absolute_timeout")]
    pub absolute_timeout_minutes: u64,
    /// Extra lifetime given to the per-account session index beyond the
    /// claims it references.
    #[serde(default = "default_index_grace")]
    pub index_grace_minutes: u64,
    /// Interval between retention sweeps.
    #[serde(default = "default_sweeper_interval")]
    pub sweeper_interval_minutes: u64,
    /// Upper bound for a single sweep cycle.
    #[serde(default = "default_sweeper_timeout")]
    pub sweeper_timeout_seconds: u64,
    /// Keys requested per SCAN page while sweeping orphaned index entries.
    #[serde(default = "default_sweeper_batch")]
    pub sweeper_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: default_idle_timeout(),
            absolute_timeout_minutes: default_absolute_timeout(),
            index_grace_minutes: default_index_grace(),
            sweeper_interval_minutes: default_sweeper_interval(),
            sweeper_timeout_seconds: default_sweeper_timeout(),
            sweeper_batch_size: default_sweeper_batch(),
        }
    }
}

impl SessionConfig {
    /// Idle cutoff.
    pub fn idle_timeout(&self) -> Duration {
        minutes(self.idle_timeout_minutes)
    }

    /// TTL applied to stored claims.
    pub fn absolute_timeout(&self) -> Duration {
        minutes(self.absolute_timeout_minutes)
    }

    /// Extra index lifetime beyond the claims it references.
    pub fn index_grace(&self) -> Duration {
        minutes(self.index_grace_minutes)
    }

    /// Sweep interval.
    pub fn sweeper_interval(&self) -> Duration {
        minutes(self.sweeper_interval_minutes)
    }

    /// Per-cycle sweep budget.
    pub fn sweeper_timeout(&self) -> Duration {
        Duration::from_secs(self.sweeper_timeout_seconds)
    }

    /// Reject zero or out-of-range timings.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.idle_timeout_minutes == 0 || self.absolute_timeout_minutes == 0 {
            return Err(AppError::configuration(
                "session timeouts must be positive",
            ));
        }
        if self.sweeper_interval_minutes == 0
            || self.sweeper_timeout_seconds == 0
            || self.sweeper_batch_size == 0
        {
            return Err(AppError::configuration(
                "session sweeper interval, timeout, and batch size must be positive",
            ));
        }
        let timings = [
            ("idle_timeout_minutes", self.idle_timeout()),
            ("absolute_timeout_minutes", self.absolute_timeout()),
            ("index_grace_minutes", self.index_grace()),
            ("sweeper_interval_minutes", self.sweeper_interval()),
            ("sweeper_timeout_seconds", self.sweeper_timeout()),
        ];
        if let Some((name, _)) = timings.iter().find(|(_, value)| *value > MAX_LIFETIME) {
            return Err(AppError::configuration(format!(
                "session.{name} exceeds the {} day maximum",
                MAX_LIFETIME.as_secs() / 86_400
            )));
        }
        Ok(())
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

fn default_idle_timeout() -> u64 {
    120
}

fn default_absolute_timeout() -> u64 {
    120
}

fn default_index_grace() -> u64 {
    60
}

fn default_sweeper_interval() -> u64 {
    360
}

fn default_sweeper_timeout() -> u64 {
    30
}

fn default_sweeper_batch() -> usize {
    200
}

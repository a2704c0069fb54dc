//! Session lifecycle management and background retention.

pub mod cleanup;
pub mod manager;

pub use cleanup::{RetentionSweeper, SweepReport, SweeperHandle};
pub use manager::{HealthReport, SessionManager};

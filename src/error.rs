//! Unified error types for the dosing core.
//!
//! Every fallible operation funnels into [`DoserError`], keeping the
//! caller's handling uniform: validation and not-found conditions
//! surface synchronously with no mutation performed, while actuation
//! errors inside a scheduler-driven run are logged and swallowed by
//! [`Runner::run`](crate::app::runner::Runner::run).

use thiserror::Error;

use crate::app::ports::{HardwareError, ScheduleError, StoreError};

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, DoserError>;

#[derive(Debug, Error)]
pub enum DoserError {
    /// Bad configuration, rejected before any mutation.
    #[error("invalid pump configuration: {0}")]
    Validation(String),

    /// No persisted pump under the given identity.
    #[error("pump not found: {0}")]
    NotFound(String),

    /// The six-field cron expression was rejected.
    #[error("invalid dosing schedule: {0}")]
    Schedule(#[from] ScheduleError),

    /// Calibration data that would produce a nonsensical dose volume.
    #[error("degenerate calibration: measured volume {measured}")]
    Calibration { measured: f64 },

    /// A step-based pump with no established stepper connection.
    #[error("pump {0}: stepper hardware not configured")]
    HardwareNotConfigured(String),

    /// Neither a time nor a steps actuation config is set.
    #[error("pump {0}: no actuation configuration")]
    UnconfiguredPump(String),

    /// Record store failure other than not-found.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// Relay or stepper collaborator failure.
    #[error("hardware: {0}")]
    Hardware(#[from] HardwareError),
}

//! Dosing-pump scheduling and actuation core.
//!
//! Decides *when* a peristaltic or stepper dosing pump runs, computes
//! *how much* to dose given calibration history, and drives the pump
//! through one of two interchangeable actuation strategies (relay
//! time-based or stepper step-based).
//!
//! All interaction with the outside world — the record store, the relay
//! board, stepper controllers, the cron scheduler, and usage telemetry —
//! happens through the **port traits** in [`app::ports`], keeping the
//! core fully testable without real hardware or external services.
//! Default in-process implementations live under [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod calibration;
pub mod pump;
pub mod schedule;

mod error;

pub use error::{DoserError, Result};

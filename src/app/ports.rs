//! Port traits — the hexagonal boundary between the dosing core and its
//! collaborators.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DoserService / Runner (domain)
//! ```
//!
//! Driven adapters (the record store, the relay board, stepper
//! controllers, the cron scheduler, telemetry, the wall clock) implement
//! these traits. The domain holds them as `Arc<dyn _>` handles so
//! runners can be dispatched onto scheduler threads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ───────────────────────────────────────────────────────────────
// Record store port
// ───────────────────────────────────────────────────────────────

/// Key/bucket object store holding the persisted pump records.
///
/// Identity assignment belongs to the store: `create` calls `assign`
/// with the id it picked and persists whatever value comes back.
pub trait StorePort: Send + Sync {
    fn get(&self, bucket: &str, id: &str) -> Result<Value, StoreError>;

    /// All records in the bucket, in store-iteration order.
    fn list(&self, bucket: &str) -> Result<Vec<(String, Value)>, StoreError>;

    /// Persist a new record under a store-assigned id; returns that id.
    fn create(&self, bucket: &str, assign: &dyn Fn(&str) -> Value) -> Result<String, StoreError>;

    /// Full replace of an existing record.
    fn update(&self, bucket: &str, id: &str, value: Value) -> Result<(), StoreError>;

    fn delete(&self, bucket: &str, id: &str) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Actuation ports (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Relay/output-channel control for time-based dosing.
///
/// `values` maps pin index → numeric signal; semantics of the signal
/// are owned by the relay driver.
pub trait JackPort: Send + Sync {
    fn control(&self, jack: &str, values: &HashMap<i32, f64>) -> Result<(), HardwareError>;
}

/// One established stepper-controller connection.
pub trait StepperPort: Send + Sync {
    /// Acceleration/deceleration in steps/sec².
    fn set_acceleration(&self, device_id: i32, value: f32) -> Result<(), HardwareError>;

    /// Speed in steps/sec (maximum speed when acceleration is active).
    fn set_speed(&self, device_id: i32, value: f32) -> Result<(), HardwareError>;

    /// Relative move by a signed step count.
    fn step(&self, device_id: i32, steps: i32) -> Result<(), HardwareError>;
}

/// Registry of stepper controllers, keyed by connection name.
///
/// Wire-level device configuration (pin wiring, step mode) is the
/// driver's capability, not part of this contract.
pub trait StepperBank: Send + Sync {
    /// Establish (or reuse) the named connection.
    fn connect(&self, name: &str) -> Result<Arc<dyn StepperPort>, HardwareError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler port
// ───────────────────────────────────────────────────────────────

/// A scheduler-runnable unit of work. The scheduler consumes no return
/// value; failures are the job's own business.
pub trait Job: Send + Sync + 'static {
    fn run(&self);
}

/// Opaque identifier for one registered recurring invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(pub u64);

/// Cron-style recurring scheduler. Each firing runs on its own thread
/// of execution; a job may block for its full dose duration without
/// delaying other due jobs.
pub trait SchedulerPort: Send + Sync {
    /// Register `job` under a six-field cron spec.
    fn add_job(&self, spec: &str, job: Arc<dyn Job>) -> Result<JobHandle, ScheduleError>;

    /// Stop future firings. In-flight runs are not cancelled.
    fn remove_job(&self, handle: JobHandle);
}

// ───────────────────────────────────────────────────────────────
// Telemetry port
// ───────────────────────────────────────────────────────────────

/// One completed dose, recorded against the pump identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub time: DateTime<Utc>,
    /// The configured target volume, not the calibration-corrected
    /// actuated amount.
    pub volume: f64,
}

/// Usage telemetry collaborator.
pub trait TelemetryPort: Send + Sync {
    /// Start tracking a newly created pump identity.
    fn initialize(&self, pump_id: &str);

    /// Record one completed dose.
    fn update(&self, pump_id: &str, usage: Usage);

    /// Flush the pump's records to wherever the adapter persists them.
    fn save(&self, pump_id: &str) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock time and blocking sleep.
///
/// Dose waits go through this port so tests can fast-forward a
/// multi-second dose deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Port error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StorePort`] operations. `NotFound` is distinguishable
/// from I/O failures so callers can map it to a domain not-found.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record for id {0}")]
    NotFound(String),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("i/o: {0}")]
    Io(String),
}

/// Errors from the relay and stepper collaborators.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("unknown device: {0}")]
    UnknownDevice(String),
    #[error("{0}")]
    Io(String),
}

/// A cron spec the scheduler refused to register.
#[derive(Debug, Error)]
#[error("cron spec rejected: {reason}")]
pub struct ScheduleError {
    pub reason: String,
}

//! Mock collaborators for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without touching real relays, steppers, or the wall clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use reefdose::app::ports::{
    Clock, HardwareError, JackPort, Job, JobHandle, ScheduleError, SchedulerPort, StepperBank,
    StepperPort, StoreError, TelemetryPort, Usage,
};

// ── Relay board ───────────────────────────────────────────────

#[derive(Default)]
pub struct MockJack {
    pub calls: Mutex<Vec<(String, Vec<(i32, f64)>)>>,
}

#[allow(dead_code)]
impl MockJack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, Vec<(i32, f64)>)> {
        self.calls.lock().clone()
    }
}

impl JackPort for MockJack {
    fn control(&self, jack: &str, values: &HashMap<i32, f64>) -> Result<(), HardwareError> {
        let mut pins: Vec<(i32, f64)> = values.iter().map(|(k, v)| (*k, *v)).collect();
        pins.sort_by_key(|(pin, _)| *pin);
        self.calls.lock().push((jack.to_string(), pins));
        Ok(())
    }
}

// ── Stepper controllers ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StepperCall {
    SetAcceleration { device_id: i32, value: f32 },
    SetSpeed { device_id: i32, value: f32 },
    Step { device_id: i32, steps: i32 },
}

#[derive(Default)]
pub struct MockStepper {
    pub calls: Mutex<Vec<StepperCall>>,
}

impl StepperPort for MockStepper {
    fn set_acceleration(&self, device_id: i32, value: f32) -> Result<(), HardwareError> {
        self.calls
            .lock()
            .push(StepperCall::SetAcceleration { device_id, value });
        Ok(())
    }

    fn set_speed(&self, device_id: i32, value: f32) -> Result<(), HardwareError> {
        self.calls
            .lock()
            .push(StepperCall::SetSpeed { device_id, value });
        Ok(())
    }

    fn step(&self, device_id: i32, steps: i32) -> Result<(), HardwareError> {
        self.calls.lock().push(StepperCall::Step { device_id, steps });
        Ok(())
    }
}

/// Stepper registry handing out one shared [`MockStepper`] and
/// recording which connection names were requested.
#[derive(Default)]
pub struct MockStepperBank {
    pub stepper: Arc<MockStepper>,
    pub connects: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockStepperBank {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepperBank for MockStepperBank {
    fn connect(&self, name: &str) -> Result<Arc<dyn StepperPort>, HardwareError> {
        self.connects.lock().push(name.to_string());
        Ok(Arc::clone(&self.stepper) as Arc<dyn StepperPort>)
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// A scheduler that never fires on its own: tests trigger registered
/// jobs synchronously with [`ManualScheduler::fire_all`]. Specs are
/// still parsed, so a malformed expression is rejected the way the
/// real scheduler would reject it.
#[derive(Default)]
pub struct ManualScheduler {
    next: AtomicU64,
    jobs: Mutex<HashMap<JobHandle, (String, Arc<dyn Job>)>>,
}

#[allow(dead_code)]
impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Cron specs of all live jobs.
    pub fn specs(&self) -> Vec<String> {
        self.jobs.lock().values().map(|(s, _)| s.clone()).collect()
    }

    /// Run every registered job once, on the calling thread.
    pub fn fire_all(&self) {
        let jobs: Vec<Arc<dyn Job>> = self
            .jobs
            .lock()
            .values()
            .map(|(_, job)| Arc::clone(job))
            .collect();
        for job in jobs {
            job.run();
        }
    }
}

impl SchedulerPort for ManualScheduler {
    fn add_job(&self, spec: &str, job: Arc<dyn Job>) -> Result<JobHandle, ScheduleError> {
        use std::str::FromStr;
        cron::Schedule::from_str(spec).map_err(|err| ScheduleError {
            reason: format!("'{spec}': {err}"),
        })?;
        let handle = JobHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.jobs.lock().insert(handle, (spec.to_string(), job));
        Ok(handle)
    }

    fn remove_job(&self, handle: JobHandle) {
        self.jobs.lock().remove(&handle);
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Returns a fixed timestamp and records requested sleeps instead of
/// blocking, fast-forwarding multi-second doses to nothing.
#[derive(Default)]
pub struct InstantClock {
    pub slept: Mutex<Vec<Duration>>,
}

#[allow(dead_code)]
impl InstantClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

impl Clock for InstantClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 4, 12, 0, 0).unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

// ── Telemetry ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTelemetry {
    pub initialized: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<(String, Usage)>>,
    pub saves: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetryPort for RecordingTelemetry {
    fn initialize(&self, pump_id: &str) {
        self.initialized.lock().push(pump_id.to_string());
    }

    fn update(&self, pump_id: &str, usage: Usage) {
        self.updates.lock().push((pump_id.to_string(), usage));
    }

    fn save(&self, pump_id: &str) -> Result<(), StoreError> {
        self.saves.lock().push(pump_id.to_string());
        Ok(())
    }
}

//! Doser service — pump lifecycle and schedule ownership.
//!
//! [`DoserService`] owns the pump registry (CRUD against the store) and
//! the live mapping from pump identity to scheduled-job handle. It is
//! the only component that creates, replaces, or removes scheduled
//! jobs, and every mutation of the job table happens under one
//! service-wide lock. Dosing itself never takes that lock: a runner
//! works on the snapshot and collaborator handles captured when its job
//! was registered.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use log::{error, info};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{DoserError, Result};
use crate::pump::{CalibrationDetails, DosingRegiment, Pump};

use super::ports::{
    Clock, JackPort, JobHandle, SchedulerPort, StepperBank, StoreError, StorePort, TelemetryPort,
};
use super::runner::Runner;

/// Store bucket holding the pump records.
pub const BUCKET: &str = "pumps";

pub struct DoserService {
    store: Arc<dyn StorePort>,
    jacks: Arc<dyn JackPort>,
    /// Absent on installations without stepper hardware; step-based
    /// pumps then fail at dose time, not at configuration time.
    steppers: Option<Arc<dyn StepperBank>>,
    scheduler: Arc<dyn SchedulerPort>,
    telemetry: Arc<dyn TelemetryPort>,
    clock: Arc<dyn Clock>,
    /// pump id → live job handle. Invariant: an id is present iff the
    /// pump currently has an active, enabled scheduled job.
    jobs: Mutex<HashMap<String, JobHandle>>,
}

impl DoserService {
    pub fn new(
        store: Arc<dyn StorePort>,
        jacks: Arc<dyn JackPort>,
        steppers: Option<Arc<dyn StepperBank>>,
        scheduler: Arc<dyn SchedulerPort>,
        telemetry: Arc<dyn TelemetryPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            jacks,
            steppers,
            scheduler,
            telemetry,
            clock,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    // ── Registry reads ────────────────────────────────────────

    pub fn get(&self, id: &str) -> Result<Pump> {
        let value = self.store.get(BUCKET, id).map_err(|e| store_err(id, e))?;
        decode(value)
    }

    /// All persisted pumps, in store-iteration order.
    pub fn list(&self) -> Result<Vec<Pump>> {
        let mut pumps = Vec::new();
        for (_, value) in self.store.list(BUCKET)? {
            pumps.push(decode(value)?);
        }
        Ok(pumps)
    }

    // ── Registry writes ───────────────────────────────────────

    /// Validate and persist a new pump, letting the store assign its
    /// identity; register its schedule when the regiment is enabled.
    ///
    /// A scheduling failure leaves the pump persisted but unscheduled;
    /// the caller sees the error and can retry via `update`.
    pub fn create(&self, mut pump: Pump) -> Result<Pump> {
        pump.validate()?;
        let template = serde_json::to_value(&pump).map_err(StoreError::from)?;
        let id = self.store.create(BUCKET, &|id| {
            let mut value = template.clone();
            if let Value::Object(record) = &mut value {
                record.insert("id".into(), Value::String(id.to_string()));
            }
            value
        })?;
        pump.id = id;

        self.telemetry.initialize(&pump.id);
        if pump.regiment.enable {
            self.register_schedule(&pump)?;
        }
        Ok(pump)
    }

    /// Full replace of the persisted record, then re-derive scheduling:
    /// any existing job is removed, and a fresh one registered when the
    /// new regiment is enabled. At most one live job per pump identity.
    pub fn update(&self, id: &str, mut pump: Pump) -> Result<()> {
        pump.validate()?;
        pump.id = id.to_string();
        let value = serde_json::to_value(&pump).map_err(StoreError::from)?;
        self.store
            .update(BUCKET, id, value)
            .map_err(|e| store_err(id, e))?;

        self.unschedule(id);
        if pump.regiment.enable {
            self.register_schedule(&pump)?;
        }
        Ok(())
    }

    /// Replace only the pump's regiment, re-deriving its schedule.
    ///
    /// The new regiment's cron expression is validated up front so a
    /// malformed schedule is rejected before any mutation.
    pub fn schedule(&self, id: &str, regiment: DosingRegiment) -> Result<()> {
        regiment.schedule.validate()?;
        let mut pump = self.get(id)?;
        pump.regiment = regiment;
        self.update(id, pump)
    }

    /// Remove the pump's live job, then its persisted record.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.unschedule(id);
        self.store.delete(BUCKET, id).map_err(|e| store_err(id, e))
    }

    // ── Calibration ───────────────────────────────────────────

    /// Dispatch a one-off dose of the *requested* volume on a detached
    /// thread. Best effort: the call returns before the dose runs, and
    /// dose errors are only logged.
    pub fn calibrate(&self, id: &str, details: CalibrationDetails) -> Result<()> {
        let _table = self.jobs.lock(); // setup runs under the service lock

        let pump = self.get(id)?;
        let runner = self.runner_for(&pump)?;
        info!("doser: calibration run for pump {}", pump.name);

        let volume = details.volume;
        thread::spawn(move || {
            if let Err(err) = runner.dose(volume) {
                error!("doser: calibration dose failed: {err}");
            }
        });
        Ok(())
    }

    // ── Scheduling internals ──────────────────────────────────

    /// Build a runner over the pump's current snapshot and submit it to
    /// the scheduler, recording the handle in the job table. Any prior
    /// entry for the identity is removed from the scheduler.
    fn register_schedule(&self, pump: &Pump) -> Result<()> {
        let runner = self.runner_for(pump)?;
        let spec = pump.regiment.schedule.cron_spec();
        let handle = self.scheduler.add_job(&spec, Arc::new(runner))?;

        let mut jobs = self.jobs.lock();
        if let Some(prior) = jobs.insert(pump.id.clone(), handle) {
            self.scheduler.remove_job(prior);
        }
        drop(jobs);
        info!(
            "doser: scheduled pump {} ({}) with spec '{spec}'",
            pump.id, pump.name
        );
        Ok(())
    }

    /// Drop the pump's job table entry and cancel the job, if present.
    /// The whole remove-and-cancel sequence runs under the lock.
    fn unschedule(&self, id: &str) {
        let mut jobs = self.jobs.lock();
        if let Some(handle) = jobs.remove(id) {
            info!("doser: removing job {handle:?} for pump {id}");
            self.scheduler.remove_job(handle);
        }
    }

    /// Runner bound to the pump snapshot and shared collaborators,
    /// resolving the named stepper connection when the pump is
    /// step-based and a stepper bank is installed.
    fn runner_for(&self, pump: &Pump) -> Result<Runner> {
        let stepper = match (&pump.firmata_steps, &self.steppers) {
            (Some(cfg), Some(bank)) => Some(bank.connect(&cfg.firmata)?),
            _ => None,
        };
        Ok(Runner::new(
            pump.clone(),
            Arc::clone(&self.jacks),
            stepper,
            Arc::clone(&self.telemetry),
            Arc::clone(&self.clock),
        ))
    }
}

fn decode(value: Value) -> Result<Pump> {
    Ok(serde_json::from_value(value).map_err(StoreError::from)?)
}

fn store_err(id: &str, err: StoreError) -> DoserError {
    match err {
        StoreError::NotFound(_) => DoserError::NotFound(id.to_string()),
        other => other.into(),
    }
}

//! Dose execution.
//!
//! A [`Runner`] executes exactly one dosing event end-to-end: compute
//! the calibration-adjusted volume, drive the configured actuation
//! strategy, record usage telemetry. It is the unit of work for both
//! scheduled (cron-triggered) runs and ad-hoc calibration runs.
//!
//! A runner owns an immutable snapshot of the pump taken at
//! registration time. Reconfiguring a pump replaces its job; an
//! in-flight dose of the prior job simply finishes with the stale
//! snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::calibration;
use crate::error::{DoserError, Result};
use crate::pump::{FirmataStepsConfig, Pump, TimeConfig};

use super::ports::{Clock, JackPort, Job, StepperPort, TelemetryPort, Usage};

pub struct Runner {
    pump: Pump,
    jacks: Arc<dyn JackPort>,
    stepper: Option<Arc<dyn StepperPort>>,
    telemetry: Arc<dyn TelemetryPort>,
    clock: Arc<dyn Clock>,
}

impl Runner {
    pub(crate) fn new(
        pump: Pump,
        jacks: Arc<dyn JackPort>,
        stepper: Option<Arc<dyn StepperPort>>,
        telemetry: Arc<dyn TelemetryPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pump,
            jacks,
            stepper,
            telemetry,
            clock,
        }
    }

    /// Dose `volume` through whichever actuation strategy the pump
    /// carries. Time-based wins when both configs are set.
    pub fn dose(&self, volume: f64) -> Result<()> {
        if !volume.is_finite() || volume < 0.0 {
            return Err(DoserError::Validation(format!(
                "pump {}: dose volume must be non-negative, got {volume}",
                self.pump.name
            )));
        }
        if let Some(cfg) = &self.pump.time {
            return self.time_dose(cfg, volume);
        }
        if let Some(cfg) = &self.pump.firmata_steps {
            return self.step_dose(cfg, volume as i32);
        }
        Err(DoserError::UnconfiguredPump(self.pump.name.clone()))
    }

    /// Energize the pin at the configured flow rate, hold for
    /// `volume / speed` seconds, then de-energize. The hold blocks the
    /// calling thread for the full duration; there is no cancellation.
    fn time_dose(&self, cfg: &TimeConfig, volume: f64) -> Result<()> {
        if !cfg.speed.is_finite() || cfg.speed <= 0.0 {
            return Err(DoserError::Validation(format!(
                "pump {}: flow rate must be positive, got {}",
                self.pump.name, cfg.speed
            )));
        }
        let duration = Duration::from_secs_f64(volume / cfg.speed);

        let mut values = HashMap::new();
        values.insert(cfg.pin, cfg.speed);
        self.jacks.control(&cfg.jack, &values)?;

        self.clock.sleep(duration);

        values.insert(cfg.pin, 0.0);
        self.jacks.control(&cfg.jack, &values)?;
        Ok(())
    }

    /// Configure acceleration and speed, then command the step count.
    /// Any failing call aborts the remainder.
    fn step_dose(&self, cfg: &FirmataStepsConfig, steps: i32) -> Result<()> {
        let Some(stepper) = &self.stepper else {
            return Err(DoserError::HardwareNotConfigured(self.pump.name.clone()));
        };
        stepper.set_acceleration(cfg.device_id, cfg.acceleration)?;
        stepper.set_speed(cfg.device_id, cfg.speed)?;
        stepper.step(cfg.device_id, steps)?;
        Ok(())
    }

    /// Scheduler entry point: one best-effort scheduled dose.
    ///
    /// Errors are logged and swallowed — there is no caller to report
    /// to, and the next cron tick is the only retry. Usage records the
    /// configured regiment volume, not the adjusted amount.
    pub fn run(&self) {
        info!("doser: scheduled run for pump {}", self.pump.name);

        let volume = match calibration::adjusted_volume(
            self.pump.regiment.volume,
            self.pump.calibration.as_ref(),
        ) {
            Ok(v) => v,
            Err(err) => {
                error!("doser: pump {}: {err}", self.pump.name);
                return;
            }
        };

        if let Err(err) = self.dose(volume) {
            error!("doser: pump {}: dose failed: {err}", self.pump.name);
            return;
        }

        let usage = Usage {
            time: self.clock.now(),
            volume: self.pump.regiment.volume,
        };
        self.telemetry.update(&self.pump.id, usage);
        if let Err(err) = self.telemetry.save(&self.pump.id) {
            warn!("doser: pump {}: usage save failed: {err}", self.pump.name);
        }
    }
}

impl Job for Runner {
    fn run(&self) {
        Runner::run(self);
    }
}

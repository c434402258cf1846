//! Pump data model.
//!
//! These are the persisted shapes; field names match the JSON records
//! the surrounding controller stores and serves, so existing databases
//! and clients keep working.
//!
//! A pump carries at most one *active* actuation config: when both
//! `time` and `firmata_steps` are set, the time-based path wins; when
//! neither is set the pump persists fine but fails at dose time.

use serde::{Deserialize, Serialize};

use crate::error::{DoserError, Result};
use crate::schedule::Schedule;

/// A configured dosing unit.
///
/// The `id` is assigned by the store on creation and immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pump {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Relay-based actuation config, if any.
    #[serde(default)]
    pub time: Option<TimeConfig>,
    /// Stepper-based actuation config, if any.
    #[serde(rename = "firmataSteps", default)]
    pub firmata_steps: Option<FirmataStepsConfig>,
    /// Most recent calibration run result; absent until calibrated.
    #[serde(default)]
    pub calibration: Option<CalibrationResult>,
    #[serde(default)]
    pub regiment: DosingRegiment,
}

impl Pump {
    /// Reject configurations that must never be persisted.
    ///
    /// Only the regiment volume is checked here; actuation-config
    /// mutual exclusivity is deliberately not enforced.
    pub fn validate(&self) -> Result<()> {
        if !self.regiment.volume.is_finite() || self.regiment.volume < 0.0 {
            return Err(DoserError::Validation(format!(
                "dosing volume must be non-negative, got {}",
                self.regiment.volume
            )));
        }
        Ok(())
    }
}

/// Relay-based pump: energize `pin` on jack `jack` at `speed` for
/// `volume / speed` seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Output-channel (relay board) identifier.
    pub jack: String,
    /// Output-pin index on the jack.
    pub pin: i32,
    /// Flow rate in volume units per second.
    pub speed: f64,
}

/// Stepper-based pump: command `volume` steps on a named stepper
/// controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmataStepsConfig {
    /// Stepper controller (serial connection) identifier.
    pub firmata: String,
    #[serde(rename = "deviceID")]
    pub device_id: i32,
    /// Steps per second.
    pub speed: f32,
    /// Steps per second squared.
    pub acceleration: f32,
}

/// The dosing schedule and uncalibrated target volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DosingRegiment {
    pub enable: bool,
    pub schedule: Schedule,
    /// Target volume per dose; corrected at run time by the pump's
    /// calibration result.
    pub volume: f64,
}

/// The requested volume of a calibration run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationDetails {
    pub volume: f64,
}

/// Outcome of a calibration run: what was requested vs. what the pump
/// actually dispensed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub details: CalibrationDetails,
    #[serde(rename = "measuredVolume")]
    pub measured_volume: f64,
}

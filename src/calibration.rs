//! Calibration-correction model.
//!
//! A calibration run doses a known requested volume; the operator
//! measures what actually came out. The ratio `requested / measured`
//! then corrects every scheduled dose: a pump that under-delivers gets
//! scaled up, one that over-delivers gets scaled down.

use crate::error::{DoserError, Result};
use crate::pump::CalibrationResult;

/// Scale `target` by the pump's calibration correction factor.
///
/// With no calibration result the target passes through unchanged.
/// A measured volume of zero (or worse) cannot produce a meaningful
/// factor and fails the computation rather than yielding inf/NaN.
pub fn adjusted_volume(target: f64, calibration: Option<&CalibrationResult>) -> Result<f64> {
    let Some(cal) = calibration else {
        return Ok(target);
    };
    if !cal.measured_volume.is_finite() || cal.measured_volume <= 0.0 {
        return Err(DoserError::Calibration {
            measured: cal.measured_volume,
        });
    }
    Ok(target * cal.details.volume / cal.measured_volume)
}

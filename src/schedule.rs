//! Dosing schedule: six independently wildcardable cron fields.
//!
//! Serializes to a six-field cron expression in the fixed order
//! second → minute → hour → day → month → week-day, the format a
//! seconds-capable cron grammar expects.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::ports::ScheduleError;
use crate::error::Result;

/// When a pump's regiment fires.
///
/// Field order here matches the persisted JSON record, not the cron
/// expression; [`Schedule::cron_spec`] owns the expression order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub day: String,
    pub hour: String,
    pub minute: String,
    pub second: String,
    pub week: String,
    pub month: String,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            day: "*".into(),
            hour: "*".into(),
            minute: "*".into(),
            second: "*".into(),
            week: "*".into(),
            month: "*".into(),
        }
    }
}

impl Schedule {
    /// The six-field cron expression for this schedule.
    pub fn cron_spec(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.second, self.minute, self.hour, self.day, self.month, self.week
        )
    }

    /// Parse the expression under the seconds-capable cron grammar,
    /// rejecting the schedule if any field is malformed.
    pub fn validate(&self) -> Result<()> {
        let spec = self.cron_spec();
        cron::Schedule::from_str(&spec).map_err(|err| ScheduleError {
            reason: format!("'{spec}': {err}"),
        })?;
        Ok(())
    }
}

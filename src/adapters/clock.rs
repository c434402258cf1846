//! System clock adapter.

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::ports::Clock;

/// Wall-clock [`Clock`] backed by the OS: `chrono` for timestamps and a
/// blocking thread sleep for dose waits.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

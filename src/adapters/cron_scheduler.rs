//! Thread-based cron scheduler.
//!
//! One watcher thread per registered job computes the next due time
//! from the six-field cron spec and waits on a condvar until then.
//! Each firing is dispatched onto its own detached thread, so a dose
//! that blocks for minutes never delays other due jobs.
//!
//! `remove_job` flags the watcher's cancellation signal and wakes it;
//! in-flight firings are not cancelled. Watcher threads are detached —
//! the scheduler is a process-lifetime service.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::app::ports::{Job, JobHandle, ScheduleError, SchedulerPort};

/// Cancellation signal shared between the scheduler and one watcher.
struct JobControl {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

#[derive(Default)]
pub struct CronScheduler {
    next_handle: AtomicU64,
    controls: Mutex<HashMap<JobHandle, Arc<JobControl>>>,
}

impl CronScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered (not yet removed) jobs.
    pub fn job_count(&self) -> usize {
        self.controls.lock().len()
    }
}

impl SchedulerPort for CronScheduler {
    fn add_job(&self, spec: &str, job: Arc<dyn Job>) -> Result<JobHandle, ScheduleError> {
        let schedule = cron::Schedule::from_str(spec).map_err(|err| ScheduleError {
            reason: format!("'{spec}': {err}"),
        })?;

        let handle = JobHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        let control = Arc::new(JobControl {
            cancelled: Mutex::new(false),
            wake: Condvar::new(),
        });
        self.controls.lock().insert(handle, Arc::clone(&control));

        thread::spawn(move || watch(handle, &schedule, &job, &control));
        Ok(handle)
    }

    fn remove_job(&self, handle: JobHandle) {
        if let Some(control) = self.controls.lock().remove(&handle) {
            *control.cancelled.lock() = true;
            control.wake.notify_all();
        }
    }
}

/// Watcher loop: wait until the next due time or cancellation,
/// whichever comes first, then spawn the firing and go around again.
fn watch(handle: JobHandle, schedule: &cron::Schedule, job: &Arc<dyn Job>, control: &JobControl) {
    loop {
        let now = Utc::now();
        let Some(next) = schedule.after(&now).next() else {
            debug!("scheduler: job {handle:?} has no future firings, watcher exiting");
            return;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        let deadline = Instant::now() + wait;

        let mut cancelled = control.cancelled.lock();
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            // Timeout vs. wake-up is irrelevant; the loop re-checks both.
            let _ = control.wake.wait_for(&mut cancelled, deadline - now);
        }
        if *cancelled {
            debug!("scheduler: job {handle:?} cancelled");
            return;
        }
        drop(cancelled);

        let job = Arc::clone(job);
        thread::spawn(move || job.run());
    }
}

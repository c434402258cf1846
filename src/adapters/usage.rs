//! In-memory usage telemetry tracker.
//!
//! Keeps a bounded per-pump history of completed doses. `save` is where
//! a persistent adapter would flush to disk; here it only trims, so the
//! tracker never grows past the history limit.

use std::collections::{HashMap, VecDeque};

use log::debug;
use parking_lot::Mutex;

use crate::app::ports::{StoreError, TelemetryPort, Usage};

/// Usage records retained per pump.
const HISTORY_LIMIT: usize = 180;

#[derive(Default)]
pub struct UsageTracker {
    history: Mutex<HashMap<String, VecDeque<Usage>>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded doses for a pump, oldest first. Empty for unknown ids.
    pub fn history(&self, pump_id: &str) -> Vec<Usage> {
        self.history
            .lock()
            .get(pump_id)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl TelemetryPort for UsageTracker {
    fn initialize(&self, pump_id: &str) {
        self.history.lock().entry(pump_id.to_string()).or_default();
        debug!("telemetry: tracking pump {pump_id}");
    }

    fn update(&self, pump_id: &str, usage: Usage) {
        let mut history = self.history.lock();
        let records = history.entry(pump_id.to_string()).or_default();
        records.push_back(usage);
        while records.len() > HISTORY_LIMIT {
            records.pop_front();
        }
    }

    fn save(&self, _pump_id: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

//! In-memory bucket/key record store.
//!
//! Identity assignment lives here: `create` hands out monotonically
//! increasing numeric-string ids per bucket, the way the production
//! store's sequence does. Iteration order is stable (sorted by id
//! string); callers get no stronger ordering guarantee.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde_json::Value;

use crate::app::ports::{StoreError, StorePort};

#[derive(Default)]
struct Bucket {
    seq: u64,
    records: BTreeMap<String, Value>,
}

/// [`StorePort`] over process memory. State does not survive a
/// restart, which also means orphaned job handles never outlive their
/// records.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorePort for MemoryStore {
    fn get(&self, bucket: &str, id: &str) -> Result<Value, StoreError> {
        self.buckets
            .lock()
            .get(bucket)
            .and_then(|b| b.records.get(id).cloned())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self, bucket: &str) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(self
            .buckets
            .lock()
            .get(bucket)
            .map(|b| {
                b.records
                    .iter()
                    .map(|(id, value)| (id.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create(&self, bucket: &str, assign: &dyn Fn(&str) -> Value) -> Result<String, StoreError> {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(bucket.to_string()).or_default();
        bucket.seq += 1;
        let id = bucket.seq.to_string();
        let value = assign(&id);
        bucket.records.insert(id.clone(), value);
        Ok(id)
    }

    fn update(&self, bucket: &str, id: &str, value: Value) -> Result<(), StoreError> {
        let mut buckets = self.buckets.lock();
        let record = buckets
            .get_mut(bucket)
            .and_then(|b| b.records.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *record = value;
        Ok(())
    }

    fn delete(&self, bucket: &str, id: &str) -> Result<(), StoreError> {
        self.buckets
            .lock()
            .get_mut(bucket)
            .and_then(|b| b.records.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

//! In-process version counter.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::VersionCounter;
use crate::error::{CounterError, CounterResult};

/// Version counter held in a mutex-guarded map.
///
/// The lock is held only for the read-increment-write of one entry.
#[derive(Debug, Default)]
pub struct MemoryVersionCounter {
    counters: Mutex<HashMap<String, u64>>,
}

impl MemoryVersionCounter {
    /// Creates a counter with no issued versions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the last issued value for an image.
    pub fn seed(&self, image_id: impl Into<String>, version: u64) {
        self.counters.lock().insert(image_id.into(), version);
    }
}

#[async_trait]
impl VersionCounter for MemoryVersionCounter {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn next_version(&self, image_id: &str) -> CounterResult<u64> {
        let mut counters = self.counters.lock();
        let slot = counters.entry(image_id.to_string()).or_insert(0);
        *slot = slot.checked_add(1).ok_or_else(|| CounterError::Overflow {
            image_id: image_id.to_string(),
        })?;
        Ok(*slot)
    }

    async fn current_version(&self, image_id: &str) -> CounterResult<Option<u64>> {
        Ok(self.counters.lock().get(image_id).copied())
    }

    async fn reset(&self, image_id: &str) -> CounterResult<()> {
        self.counters.lock().remove(image_id);
        Ok(())
    }
}

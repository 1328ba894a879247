//! In-process cache.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use amwatch_core::error::{AmwatchError, Result};
use amwatch_core::ports::AlertCache;
use amwatch_core::types::{CacheEntry, CacheKind, CachePayload};

use super::next_timestamp;

/// Cache held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(String, CacheKind), CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
        operation: &str,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(String, CacheKind), CacheEntry>>> {
        self.entries
            .lock()
            .map_err(|e| AmwatchError::cache(operation, format!("lock poisoned: {e}")))
    }
}

impl AlertCache for MemoryCache {
    fn put(&self, instance_id: &str, payload: CachePayload) -> Result<()> {
        let mut entries = self.lock("put")?;
        let key = (instance_id.to_string(), payload.kind());
        let previous = entries.get(&key).map(|e| e.timestamp);
        let timestamp = next_timestamp(Utc::now(), previous);
        entries.insert(key, CacheEntry { payload, timestamp });
        Ok(())
    }

    fn get(&self, instance_id: &str, kind: CacheKind) -> Result<Option<CacheEntry>> {
        let entries = self.lock("get")?;
        Ok(entries.get(&(instance_id.to_string(), kind)).cloned())
    }

    fn forget(&self, instance_id: &str) -> Result<()> {
        let mut entries = self.lock("forget")?;
        entries.retain(|(id, _), _| id != instance_id);
        Ok(())
    }
}

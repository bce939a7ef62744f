//! In-memory backend.
//!
//! Records live in a shared `DashMap`; nothing survives a restart. Conditional writes
//! go through the map's entry API, so they are atomic per key.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{
    StorageInterface, StorageLimits, StorageResult, StoreListOptions, StoreListing, paginate,
};

/// Concurrent in-memory backend.
///
/// Cloning is cheap and clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, String>>,
    limits: StorageLimits,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: StorageLimits) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            limits,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sorted_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageInterface for MemoryStore {
    async fn read(&self, record_id: &str) -> StorageResult<Option<String>> {
        Ok(self.records.get(record_id).map(|value| value.clone()))
    }

    async fn write(&self, record_id: &str, data: &str) -> StorageResult<()> {
        self.records.insert(record_id.to_string(), data.to_string());
        tracing::debug!("Stored record {} ({} bytes)", record_id, data.len());
        Ok(())
    }

    async fn delete(&self, record_id: &str) -> StorageResult<()> {
        self.records.remove(record_id);
        Ok(())
    }

    async fn list(&self, options: StoreListOptions) -> StorageResult<StoreListing> {
        paginate(self.sorted_keys(), &options)
    }

    fn limits(&self) -> StorageLimits {
        self.limits
    }

    async fn create(&self, record_id: &str, data: &str) -> StorageResult<bool> {
        match self.records.entry(record_id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(data.to_string());
                Ok(true)
            }
        }
    }

    async fn update(&self, record_id: &str, data: &str) -> StorageResult<bool> {
        match self.records.get_mut(record_id) {
            Some(mut value) => {
                *value = data.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

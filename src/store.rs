use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{error::StoreError, status::StatusRecord};

/// Latest-status persistence keyed by `device_id`.
///
/// `upsert` fully replaces any existing record for the key. Readers never observe
/// a partially written record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn upsert(&self, record: StatusRecord) -> Result<(), StoreError>;

    /// All records, most recently observed first.
    async fn list_all(&self) -> Result<Vec<StatusRecord>, StoreError>;

    /// Removes every record and returns how many were removed.
    async fn clear(&self) -> Result<u64, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    records: RwLock<HashMap<String, StatusRecord>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn upsert(&self, record: StatusRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(record.device_id.clone(), record);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StatusRecord>, StoreError> {
        let records = self.records.read().await;
        let mut snapshot: Vec<StatusRecord> = records.values().cloned().collect();
        snapshot.sort_by(|a, b| {
            b.observed_at
                .cmp(&a.observed_at)
                .then_with(|| a.device_id.cmp(&b.device_id))
        });
        Ok(snapshot)
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }
}

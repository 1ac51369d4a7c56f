use std::sync::Arc;

use chrono::{SubsecRound as _, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{IngestError, StoreError, ValidationError},
    reading::Attributes,
    status::{OperationalState, StatusRecord, StatusUpdate},
    store::StatusStore,
};

/// Validates status updates and applies them to the store as keyed upserts.
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn StatusStore>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Validates `update` and replaces the stored record for its device.
    ///
    /// Nothing is written when validation fails.
    pub async fn submit_status(&self, update: StatusUpdate) -> Result<StatusRecord, IngestError> {
        let (device_id, state, payload) = validate(update)?;

        // Postgres keeps microseconds; truncate so the returned record matches what is stored.
        let record = StatusRecord {
            device_id,
            state,
            payload,
            observed_at: Utc::now().trunc_subsecs(6),
        };

        self.store.upsert(record.clone()).await?;

        info!(
            device_id = %record.device_id,
            state = %record.state,
            observed_at = %record.observed_at,
            "Upserted status record"
        );
        Ok(record)
    }

    pub async fn clear_all(&self) -> Result<u64, StoreError> {
        let removed = self.store.clear().await?;

        info!(count = removed, "Deleted all status records");
        Ok(removed)
    }

    pub async fn list_statuses(&self) -> Result<Vec<StatusRecord>, StoreError> {
        let records = self.store.list_all().await?;

        debug!(count = records.len(), "Listed status records");
        Ok(records)
    }
}

fn validate(update: StatusUpdate) -> Result<(String, OperationalState, Attributes), ValidationError> {
    let device_id = match update.device_id {
        Some(Value::String(ref id)) if !id.is_empty() => id.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            return Err(ValidationError::new("device_id", "device_id is required"));
        }
        Some(_) => return Err(ValidationError::new("device_id", "device_id must be a string")),
    };

    let state = update
        .state_str()
        .and_then(|s| s.parse::<OperationalState>().ok())
        .ok_or_else(|| ValidationError::new("state", "state must be 'running' or 'idle'"))?;

    let payload = match update.payload {
        None | Some(Value::Null) => Attributes::new(),
        Some(Value::Object(map)) => map.into_iter().collect(),
        Some(_) => return Err(ValidationError::new("payload", "payload must be an object")),
    };

    Ok((device_id, state, payload))
}

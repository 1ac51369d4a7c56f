use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    error::StoreError,
    reading::Attributes,
    status::{OperationalState, StatusRecord},
    store::StatusStore,
};

pub async fn new_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to database")
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!()
        .run(pool)
        .await
        .context("failed to run database migrations")
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    device_id: String,
    state: String,
    payload: String,
    observed_at: DateTime<Utc>,
}

impl TryFrom<StatusRow> for StatusRecord {
    type Error = anyhow::Error;

    fn try_from(row: StatusRow) -> Result<Self> {
        let state: OperationalState = row
            .state
            .parse()
            .with_context(|| format!("invalid stored state for device: {}", row.device_id))?;

        let payload: Attributes = serde_json::from_str(&row.payload)
            .with_context(|| format!("invalid stored payload for device: {}", row.device_id))?;

        Ok(StatusRecord {
            device_id: row.device_id,
            state,
            payload,
            observed_at: row.observed_at,
        })
    }
}

/// Postgres-backed status store. One row per device in `device_statuses`.
#[derive(Debug, Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SQLSTATE class 22 (data exception) means the row itself was refused.
fn store_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        let rejected = matches!(
            &err,
            sqlx::Error::Database(db) if db.code().is_some_and(|code| code.starts_with("22"))
        );
        let err = anyhow::Error::new(err).context(context);
        if rejected {
            StoreError::Rejected(err)
        } else {
            StoreError::Unavailable(err)
        }
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn upsert(&self, record: StatusRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&record.payload)
            .context("failed to encode payload")
            .map_err(StoreError::Rejected)?;

        sqlx::query(
            r#"
            INSERT INTO device_statuses (device_id, state, payload, observed_at)
            VALUES ($1, $2, $3::json, $4)
            ON CONFLICT (device_id) DO UPDATE
            SET state = EXCLUDED.state, payload = EXCLUDED.payload, observed_at = EXCLUDED.observed_at
            "#,
        )
        .bind(&record.device_id)
        .bind(record.state.as_str())
        .bind(payload)
        .bind(record.observed_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("failed to execute upsert query"))?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StatusRecord>, StoreError> {
        let rows: Vec<StatusRow> = sqlx::query_as(
            r#"
            SELECT device_id, state, payload::text AS payload, observed_at
            FROM device_statuses
            ORDER BY observed_at DESC, device_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("failed to execute list query"))?;

        rows.into_iter()
            .map(StatusRecord::try_from)
            .collect::<Result<Vec<_>>>()
            .map_err(StoreError::Unavailable)
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM device_statuses")
            .execute(&self.pool)
            .await
            .map_err(store_error("failed to execute delete query"))?;

        Ok(result.rows_affected())
    }
}

//! HTTP surface of the ingestion service.
//!
//! Endpoints:
//! - POST|PUT /update_status - validate and upsert one status update
//! - POST|GET /delete_all_data - remove every status record
//! - GET /statuses - all records, most recently observed first
//! - GET /health - service health check

use std::future::Future;

use anyhow::{Context as _, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::{
    error::{IngestError, StoreError},
    ingest::IngestionService,
    status::{StatusRecord, StatusUpdate},
};

pub const UPDATE_STATUS_PATH: &str = "/update_status";

pub const DELETE_ALL_PATH: &str = "/delete_all_data";

pub const STATUSES_PATH: &str = "/statuses";

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub message: String,
    pub record: StatusRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteAllResponse {
    pub message: String,
    pub deleted_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusListResponse {
    pub statuses: Vec<StatusRecord>,
    pub record_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// An error rendered as `{"error": ...}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(v) => ApiError {
                status: StatusCode::BAD_REQUEST,
                body: ErrorResponse {
                    error: v.reason,
                    field: Some(v.field.to_string()),
                },
            },
            IngestError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        warn!(error = %err, "Status store request failed");
        let status = match err {
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        ApiError {
            status,
            body: ErrorResponse {
                error: err.to_string(),
                field: None,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: rejection.body_text(),
                field: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn router(service: IngestionService) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(UPDATE_STATUS_PATH, post(update_status).put(update_status))
        .route(DELETE_ALL_PATH, post(delete_all_data).get(delete_all_data))
        .route(STATUSES_PATH, get(list_statuses))
        .with_state(service)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, service: IngestionService, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("failed to serve HTTP")
}

async fn update_status(
    State(service): State<IngestionService>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let Json(update) = body?;
    let record = service.submit_status(update).await?;

    Ok(Json(UpdateStatusResponse {
        message: "Status updated".to_string(),
        record,
    }))
}

async fn delete_all_data(
    State(service): State<IngestionService>,
) -> Result<Json<DeleteAllResponse>, ApiError> {
    let deleted_count = service.clear_all().await?;

    Ok(Json(DeleteAllResponse {
        message: "All data deleted".to_string(),
        deleted_count,
    }))
}

async fn list_statuses(
    State(service): State<IngestionService>,
) -> Result<Json<StatusListResponse>, ApiError> {
    let statuses = service.list_statuses().await?;

    Ok(Json(StatusListResponse {
        record_count: statuses.len(),
        statuses,
    }))
}

async fn health_check() -> Json<Value> {
    debug!("Health check");
    Json(json!({
        "status": "healthy",
        "service": "status-server",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

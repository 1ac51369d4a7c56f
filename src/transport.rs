use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;

use crate::{
    error::TransportError,
    http::{ErrorResponse, UPDATE_STATUS_PATH, UpdateStatusResponse},
    status::{StatusRecord, StatusUpdate},
};

/// A status update accepted by the ingestion endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub status: u16,
    pub record: StatusRecord,
}

/// Delivers one status update to the ingestion service. No retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusTransport: Send + Sync {
    async fn send(&self, update: StatusUpdate) -> Result<Delivery, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpStatusTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStatusTransport {
    /// `base_url` is the ingestion service root, e.g. `http://localhost:5100`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), UPDATE_STATUS_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StatusTransport for HttpStatusTransport {
    async fn send(&self, update: StatusUpdate) -> Result<Delivery, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&update)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&self.endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&self.endpoint, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let accepted: UpdateStatusResponse = serde_json::from_str(&body)
            .map_err(|e| TransportError::MalformedResponse(format!("{e}: {body}")))?;

        Ok(Delivery {
            status: status.as_u16(),
            record: accepted.record,
        })
    }
}

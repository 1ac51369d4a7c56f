use thiserror::Error;

/// A status-update request that cannot be applied. `field` names the offending input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("status store unavailable: {0:#}")]
    Unavailable(#[source] anyhow::Error),

    /// The backend is reachable but refused the record's data.
    #[error("status store rejected record: {0:#}")]
    Rejected(#[source] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure delivering a status update to the ingestion endpoint.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("ingestion endpoint rejected update with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response from ingestion endpoint: {0}")]
    MalformedResponse(String),
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            TransportError::Timeout { url }
        } else if err.is_connect() {
            TransportError::Connect { url, source: err }
        } else if err.is_decode() {
            TransportError::MalformedResponse(err.to_string())
        } else {
            TransportError::Request { url, source: err }
        }
    }
}

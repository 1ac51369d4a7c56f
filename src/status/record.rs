use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{reading::Attributes, status::OperationalState};

/// The latest known status of one device. The store holds at most one per `device_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub device_id: String,

    pub state: OperationalState,

    pub payload: Attributes,

    /// Assigned on ingestion, not when the reading was taken.
    pub observed_at: DateTime<Utc>,
}

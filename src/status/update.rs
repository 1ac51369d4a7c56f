use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{reading::Attributes, status::OperationalState};

/// Body of a status-update request.
///
/// Fields are kept loose so that a malformed request reaches validation and is
/// rejected with the offending field named, instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(default, alias = "ruuvi_id", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl StatusUpdate {
    pub fn new(device_id: impl Into<String>, state: OperationalState, payload: Attributes) -> Self {
        Self {
            device_id: Some(Value::String(device_id.into())),
            state: Some(Value::from(state.as_str())),
            payload: Some(Value::Object(payload.into_iter().collect())),
        }
    }

    pub fn device_id_str(&self) -> Option<&str> {
        self.device_id.as_ref().and_then(Value::as_str)
    }

    pub fn state_str(&self) -> Option<&str> {
        self.state.as_ref().and_then(Value::as_str)
    }
}

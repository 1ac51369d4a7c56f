use indexmap::IndexMap;
use serde_json::Value;

/// Named values reported by a beacon, kept in the order the sensor produced them.
pub type Attributes = IndexMap<String, Value>;

/// One advertisement received from a sensor beacon.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: String,

    pub attributes: Attributes,
}

impl Reading {
    pub fn new(device_id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            device_id: device_id.into(),
            attributes,
        }
    }

    /// Returns the attribute as a number, or `None` when it is absent or not numeric.
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(Value::as_f64)
    }
}

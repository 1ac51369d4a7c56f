use crate::{reading::Reading, status::OperationalState};

pub const DEFAULT_ACTIVITY_ATTRIBUTE: &str = "acceleration";

pub const DEFAULT_ACTIVITY_THRESHOLD: f64 = 1000.0;

/// Maps a reading to an operational state. Implementations must be total.
pub trait Classify: Send + Sync {
    fn classify(&self, reading: &Reading) -> OperationalState;
}

impl<F> Classify for F
where
    F: Fn(&Reading) -> OperationalState + Send + Sync,
{
    fn classify(&self, reading: &Reading) -> OperationalState {
        self(reading)
    }
}

/// Reports `Running` when one numeric attribute exceeds a fixed threshold.
///
/// A missing or non-numeric attribute counts as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdClassifier {
    attribute: String,
    threshold: f64,
}

impl ThresholdClassifier {
    pub fn new(attribute: impl Into<String>, threshold: f64) -> Self {
        Self {
            attribute: attribute.into(),
            threshold,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn activity(&self, reading: &Reading) -> f64 {
        reading.numeric(&self.attribute).unwrap_or(0.0)
    }
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_ATTRIBUTE, DEFAULT_ACTIVITY_THRESHOLD)
    }
}

impl Classify for ThresholdClassifier {
    fn classify(&self, reading: &Reading) -> OperationalState {
        if self.activity(reading) > self.threshold {
            OperationalState::Running
        } else {
            OperationalState::Idle
        }
    }
}

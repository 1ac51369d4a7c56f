use std::{fmt, str::FromStr};

use anyhow::{Error, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationalState {
    Running,
    Idle,
}

impl OperationalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalState::Running => "running",
            OperationalState::Idle => "idle",
        }
    }
}

impl fmt::Display for OperationalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationalState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(OperationalState::Running),
            "idle" => Ok(OperationalState::Idle),
            _ => bail!("unknown operational state: {}", s),
        }
    }
}

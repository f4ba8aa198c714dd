//! Transform trigger
//!
//! Starts the downstream transformation job and waits for it to finish.
//! The job itself is opaque: the pipeline only sees its run id and
//! terminal status.

mod dbt_cloud;

pub use dbt_cloud::DbtCloudTrigger;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a triggered run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Queued,
    Starting,
    Running,
    Success,
    Error,
    Cancelled,
    Unknown(i64),
}

impl RunState {
    /// Map a dbt Cloud run status code
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Queued,
            2 => Self::Starting,
            3 => Self::Running,
            10 => Self::Success,
            20 => Self::Error,
            30 => Self::Cancelled,
            other => Self::Unknown(other),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Cancelled)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// A finished transform run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRun {
    pub run_id: String,
    pub state: RunState,
    /// Number of status polls made
    pub polls: u32,
}

/// Triggers the transformation job and waits for a terminal status.
///
/// Returns an error when the run ends in a non-success state or does not
/// finish in time.
#[async_trait]
pub trait TransformTrigger: Send + Sync {
    async fn run(&self) -> Result<TransformRun>;
}

#[cfg(test)]
mod tests;

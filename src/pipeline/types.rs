//! Pipeline types
//!
//! Run state and the report returned by a full run.

use crate::error::{Error, Result};
use crate::transform::TransformRun;
use crate::types::{Stage, StageReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a run is, or where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Download,
    Upload,
    WarehouseLoad,
    TriggerTransform,
    Done,
}

impl PipelineState {
    /// Start state
    pub const INITIAL: Self = Self::Download;

    /// The state after this one
    pub fn next(self) -> Self {
        match self {
            Self::Download => Self::Upload,
            Self::Upload => Self::WarehouseLoad,
            Self::WarehouseLoad => Self::TriggerTransform,
            Self::TriggerTransform | Self::Done => Self::Done,
        }
    }

    /// Stage executed in this state; `None` once done
    pub fn stage(self) -> Option<Stage> {
        match self {
            Self::Download => Some(Stage::Download),
            Self::Upload => Some(Stage::Upload),
            Self::WarehouseLoad => Some(Stage::WarehouseLoad),
            Self::TriggerTransform => Some(Stage::TriggerTransform),
            Self::Done => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage() {
            Some(stage) => write!(f, "{stage}"),
            None => write!(f, "done"),
        }
    }
}

/// The stage a run halted at, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// Outcome of one full run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pipeline: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// `Done` on success, otherwise the state the run halted in
    pub state: PipelineState,
    /// Reports of every stage that completed, in order
    pub stages: Vec<StageReport>,
    pub transform: Option<TransformRun>,
    pub failure: Option<StageFailure>,
}

impl RunReport {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            started_at: Utc::now(),
            finished_at: None,
            state: PipelineState::INITIAL,
            stages: Vec::new(),
            transform: None,
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done && self.failure.is_none()
    }

    /// Report of a completed stage
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage.as_str())
    }

    /// Whether a stage ran at all
    pub fn started(&self, stage: Stage) -> bool {
        self.stage(stage).is_some()
            || self.failure.as_ref().is_some_and(|f| f.stage == stage)
    }

    pub(crate) fn halt(&mut self, stage: Stage, message: impl Into<String>) {
        self.failure = Some(StageFailure {
            stage,
            message: message.into(),
        });
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn finish(&mut self) {
        self.state = PipelineState::Done;
        self.finished_at = Some(Utc::now());
    }

    /// Turn a halted run into [`Error::StageFailed`]
    pub fn into_result(self) -> Result<Self> {
        match &self.failure {
            Some(failure) => Err(Error::stage(failure.stage.as_str(), failure.message.clone())),
            None => Ok(self),
        }
    }
}

//! Common types used throughout the pipeline
//!
//! Per-item outcomes and the stage reports that collect them. Every stage
//! records what happened to each of its items here instead of raising, so a
//! single bad file never aborts a batch.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Retry Backoff
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Pipeline Stages
// ============================================================================

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    Upload,
    WarehouseLoad,
    TriggerTransform,
}

impl Stage {
    /// All stages, in the order the orchestrator runs them
    pub const ALL: [Stage; 4] = [
        Stage::Download,
        Stage::Upload,
        Stage::WarehouseLoad,
        Stage::TriggerTransform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Upload => "upload",
            Self::WarehouseLoad => "warehouse_load",
            Self::TriggerTransform => "trigger_transform",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Failure Classification
// ============================================================================

/// Category of an item-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport-level failure (connect, timeout, DNS)
    Network,
    /// Remote answered with a non-success status
    HttpStatus,
    /// Local file does not exist
    MissingFile,
    /// Object storage rejected the request
    Rejected,
    /// No cloud credentials available
    MissingCredentials,
    /// Cloud credentials partially configured
    IncompleteCredentials,
    /// Warehouse statement failed
    Warehouse,
    /// Other local I/O failure
    Io,
    /// Input could not be parsed
    Malformed,
    /// Configuration problem
    Config,
    /// Anything else
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::MissingFile => "missing_file",
            Self::Rejected => "rejected",
            Self::MissingCredentials => "missing_credentials",
            Self::IncompleteCredentials => "incomplete_credentials",
            Self::Warehouse => "warehouse",
            Self::Io => "io",
            Self::Malformed => "malformed",
            Self::Config => "config",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Item Outcomes
// ============================================================================

/// What happened to a single item within a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Item processed
    Succeeded { detail: String },
    /// Item intentionally not processed
    Skipped { reason: String },
    /// Item failed; the stage carried on
    Failed { kind: FailureKind, reason: String },
}

impl ItemOutcome {
    /// Create a success outcome
    pub fn succeeded(detail: impl Into<String>) -> Self {
        Self::Succeeded {
            detail: detail.into(),
        }
    }

    /// Create a skipped outcome
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Create a failure outcome from an error
    pub fn failed(err: &Error) -> Self {
        Self::Failed {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Failure kind, if this outcome is a failure
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Outcome for one named item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    /// Item name (resource, file or table)
    pub item: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

// ============================================================================
// Stage Reports
// ============================================================================

/// Collected outcomes for one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage name
    pub stage: String,
    /// Item outcomes in processing order
    pub items: Vec<ItemReport>,
}

impl StageReport {
    /// Create an empty report for a stage
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            items: Vec::new(),
        }
    }

    /// Record an outcome
    pub fn record(&mut self, item: impl Into<String>, outcome: ItemOutcome) {
        self.items.push(ItemReport {
            item: item.into(),
            outcome,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_succeeded()).count()
    }

    pub fn skipped(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_failed()).count()
    }

    /// Whether any item failed
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Look up the outcome for an item by name
    pub fn outcome(&self, item: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|i| i.item == item)
            .map(|i| &i.outcome)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{}: {} succeeded, {} skipped, {} failed",
            self.stage,
            self.succeeded(),
            self.skipped(),
            self.failed()
        )
    }
}

/// A stage report together with the typed records the stage produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput<T> {
    pub report: StageReport,
    pub produced: Vec<T>,
}

impl<T> StageOutput<T> {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            report: StageReport::new(stage),
            produced: Vec::new(),
        }
    }
}

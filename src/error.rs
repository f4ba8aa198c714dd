//! Error types for the Dublin Trips pipeline
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Item-level failures are captured in stage reports via [`Error::kind`];
//! only stage-level errors travel up to the orchestrator.

use crate::types::FailureKind;
use thiserror::Error;

/// The main error type for the pipeline
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Cleaning Errors
    // ============================================================================
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File has no header row: {path}")]
    EmptyFile { path: String },

    // ============================================================================
    // Object Storage Errors
    // ============================================================================
    #[error("The file {path} does not exist in the local directory")]
    FileNotFound { path: String },

    #[error("Storage rejected request for '{key}': {message}")]
    StorageRejected { key: String, message: String },

    #[error("AWS credentials not found")]
    MissingCredentials,

    #[error("Incomplete AWS credentials: {missing} is not set")]
    IncompleteCredentials { missing: String },

    // ============================================================================
    // Warehouse Errors
    // ============================================================================
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Warehouse load into '{table}' failed: {message}")]
    Warehouse { table: String, message: String },

    // ============================================================================
    // Transform Errors
    // ============================================================================
    #[error("Transform run {run_id} finished with status {status}")]
    TransformFailed { run_id: String, status: String },

    #[error("Transform run {run_id} did not finish within {timeout_secs}s")]
    TransformTimeout { run_id: String, timeout_secs: u64 },

    // ============================================================================
    // Orchestration Errors
    // ============================================================================
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a storage rejection error
    pub fn rejected(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageRejected {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a warehouse error for a table
    pub fn warehouse(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Warehouse {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a stage failure
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Classify this error for item reports
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_) => FailureKind::Config,
            Error::Http(_) | Error::Timeout { .. } => FailureKind::Network,
            Error::HttpStatus { .. } => FailureKind::HttpStatus,
            Error::Csv(_) | Error::EmptyFile { .. } | Error::JsonParse(_) => FailureKind::Malformed,
            Error::FileNotFound { .. } => FailureKind::MissingFile,
            Error::StorageRejected { .. } => FailureKind::Rejected,
            Error::MissingCredentials => FailureKind::MissingCredentials,
            Error::IncompleteCredentials { .. } => FailureKind::IncompleteCredentials,
            Error::Database(_) | Error::Warehouse { .. } => FailureKind::Warehouse,
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => FailureKind::MissingFile,
            Error::Io(_) => FailureKind::Io,
            _ => FailureKind::Other,
        }
    }
}

/// Result type alias for the pipeline
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("S3_BUCKET");
        assert_eq!(err.to_string(), "Missing required config field: S3_BUCKET");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::IncompleteCredentials {
            missing: "AWS_SECRET_ACCESS_KEY".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Incomplete AWS credentials: AWS_SECRET_ACCESS_KEY is not set"
        );
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::http_status(500, "").kind(), FailureKind::HttpStatus);
        assert_eq!(
            Error::FileNotFound {
                path: "x.csv".into()
            }
            .kind(),
            FailureKind::MissingFile
        );
        assert_eq!(Error::MissingCredentials.kind(), FailureKind::MissingCredentials);
        assert_eq!(
            Error::rejected("k", "403 Forbidden").kind(),
            FailureKind::Rejected
        );
        assert_eq!(Error::warehouse("routes", "boom").kind(), FailureKind::Warehouse);

        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(Error::Io(not_found).kind(), FailureKind::MissingFile);

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert_eq!(Error::Io(denied).kind(), FailureKind::Io);
    }
}

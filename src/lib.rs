// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Dublin Trips ETL
//!
//! Batch pipeline for Smart Dublin TRIPS journey-time data.
//!
//! ## Stages
//!
//! - **Fetch**: download each configured CSV resource into a staging directory
//! - **Clean**: trim headers and fields, drop rows whose field count differs from the header's
//! - **Upload**: put cleaned files into an S3 bucket, one object per file
//! - **Load**: truncate each mapped Redshift table and `COPY` the object into it
//! - **Transform**: trigger the dbt Cloud job and poll until it finishes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dublintrips_etl::{Orchestrator, PipelineConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Built-in definition plus REDSHIFT_*, S3_BUCKET, IAM_ROLE_ARN, DBT_CLOUD_* from the environment
//!     let config = PipelineConfig::load(None)?;
//!
//!     let report = Orchestrator::from_config(&config)?.run().await;
//!     for stage in &report.stages {
//!         println!("{}", stage.summary());
//!     }
//!
//!     report.into_result().map(|_| ())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌───────────┐   ┌─────────────┐
//! │ Download │ → │ Upload (+ clean) │ → │ Warehouse │ → │  Transform  │ → Done
//! │  reqwest │   │  csv, S3         │   │  Redshift │   │  dbt Cloud  │
//! └──────────┘   └──────────────────┘   └───────────┘   └─────────────┘
//!       StagedFile ──────→ UploadedObject ──→ LoadedTable ──→ TransformRun
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pipeline
pub mod error;

/// Stage names, item outcomes and stage reports
pub mod types;

/// Typed records handed between stages
pub mod manifest;

/// Pipeline definition and environment overlay
pub mod config;

/// HTTP client with optional retry
pub mod http;

/// Resource downloads
pub mod fetch;

/// CSV cleaning
pub mod clean;

/// Object storage bucket
pub mod storage;

/// Clean-and-upload of staged files
pub mod upload;

/// Redshift loading and summary queries
pub mod warehouse;

/// dbt Cloud job trigger
pub mod transform;

/// Stage orchestration
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use pipeline::{Orchestrator, RunReport};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! CLI module
//!
//! Command-line interface for running the pipeline or a single stage.
//!
//! # Commands
//!
//! - `fetch` - Download resources into the staging directory
//! - `clean` - Clean one CSV file
//! - `upload` - Clean and upload a directory to the bucket
//! - `load` - Truncate and bulk-load warehouse tables
//! - `transform` - Trigger the transformation job
//! - `run` - Full pipeline
//! - `summary` - Output table overview
//! - `show-config` - Resolved configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;

//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dublin TRIPS ETL pipeline
#[derive(Parser, Debug)]
#[command(name = "dublintrips")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline definition file (YAML); the built-in definition is used when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every resource into the staging directory
    Fetch,

    /// Clean one CSV file
    Clean {
        /// File to clean
        file: PathBuf,

        /// Output directory (defaults to the configured clean directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Clean and upload every file under a directory to the bucket
    Upload {
        /// Directory to walk (defaults to the staging directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Truncate and bulk-load every mapped table
    Load,

    /// Trigger the transformation job and wait for it
    Transform,

    /// Run the full pipeline
    Run {
        /// Halt when a stage finishes with failed items
        #[arg(long)]
        halt_on_item_failure: bool,
    },

    /// Row counts and headline metrics of the output tables
    Summary,

    /// Print the resolved configuration with secrets redacted
    ShowConfig,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

//! CLI runner - executes commands

use crate::clean::Cleaner;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::pipeline::Orchestrator;
use crate::storage::Bucket;
use crate::transform::{DbtCloudTrigger, TransformTrigger};
use crate::types::StageReport;
use crate::upload::Uploader;
use crate::warehouse::{summarize, RedshiftWarehouse, WarehouseLoader};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch => self.fetch().await,
            Commands::Clean { file, out_dir } => self.clean(file, out_dir.as_deref()),
            Commands::Upload { dir } => self.upload(dir.as_deref()).await,
            Commands::Load => self.load().await,
            Commands::Transform => self.transform().await,
            Commands::Run {
                halt_on_item_failure,
            } => self.run_pipeline(*halt_on_item_failure).await,
            Commands::Summary => self.summary().await,
            Commands::ShowConfig => self.show_config(),
        }
    }

    /// Load the pipeline definition with the environment overlaid
    fn load_config(&self) -> Result<PipelineConfig> {
        PipelineConfig::load(self.cli.config.as_deref())
    }

    async fn fetch(&self) -> Result<()> {
        let config = self.load_config()?;
        let fetcher = Fetcher::from_settings(&config.http, config.paths.staging_dir())?;

        self.log(
            "INFO",
            format!(
                "Downloading {} resources into {}",
                config.resources.len(),
                fetcher.staging_dir().display()
            ),
        );

        let output = fetcher.fetch_all(&config.resources).await?;
        self.output_report(&output.report);
        Ok(())
    }

    fn clean(&self, file: &Path, out_dir: Option<&Path>) -> Result<()> {
        let clean_dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.load_config()?.paths.clean_dir(),
        };

        let cleaned = Cleaner::new(clean_dir).clean(file)?;
        self.output_message(&json!({
            "type": "CLEANED",
            "cleaned": cleaned
        }));
        Ok(())
    }

    async fn upload(&self, dir: Option<&Path>) -> Result<()> {
        let config = self.load_config()?;
        let root = dir.map_or_else(|| config.paths.staging_dir(), Path::to_path_buf);
        let bucket = Bucket::from_config(&config.bucket)?;
        let uploader = Uploader::new(bucket, Cleaner::new(config.paths.clean_dir()));

        self.log(
            "INFO",
            format!(
                "Uploading files under {} to {}",
                root.display(),
                uploader.bucket().uri("")
            ),
        );

        let output = uploader.upload_dir(&root).await?;
        self.output_report(&output.report);
        Ok(())
    }

    async fn load(&self) -> Result<()> {
        let config = self.load_config()?;
        let warehouse = RedshiftWarehouse::from_config(&config.warehouse)?;
        self.log(
            "INFO",
            format!(
                "Loading {} tables into {}",
                config.load.len(),
                warehouse.endpoint()
            ),
        );

        let loader = WarehouseLoader::new(
            Arc::new(warehouse),
            config.bucket.require_name()?,
            config.warehouse.require_iam_role()?,
        );
        let output = loader.load_all(&config.load, None).await?;
        self.output_report(&output.report);
        Ok(())
    }

    async fn transform(&self) -> Result<()> {
        let config = self.load_config()?;
        let trigger = DbtCloudTrigger::from_config(&config.transform)?;
        self.log(
            "INFO",
            format!("Triggering dbt Cloud job {}", trigger.job_id()),
        );

        let run = trigger.run().await?;
        self.output_message(&json!({
            "type": "TRANSFORM",
            "transform": run
        }));
        Ok(())
    }

    async fn run_pipeline(&self, halt_on_item_failure: bool) -> Result<()> {
        let mut config = self.load_config()?;
        if halt_on_item_failure {
            config.run.halt_on_item_failure = true;
        }

        let start = Instant::now();
        let orchestrator = Orchestrator::from_config(&config)?;
        let report = orchestrator.run().await;

        for stage in &report.stages {
            self.output_report(stage);
        }

        self.output_message(&json!({
            "type": "RUN_SUMMARY",
            "summary": {
                "status": if report.is_success() { "SUCCEEDED" } else { "FAILED" },
                "pipeline": report.pipeline,
                "state": report.state,
                "started_at": report.started_at,
                "finished_at": report.finished_at,
                "duration_ms": start.elapsed().as_millis() as u64,
                "transform": report.transform,
                "failure": report.failure,
            }
        }));

        report.into_result().map(|_| ())
    }

    async fn summary(&self) -> Result<()> {
        let config = self.load_config()?;
        let warehouse = RedshiftWarehouse::from_config(&config.warehouse)?;
        let summary = summarize(&warehouse, &config.warehouse.schema).await?;

        self.output_message(&json!({
            "type": "SUMMARY",
            "summary": summary
        }));
        Ok(())
    }

    fn show_config(&self) -> Result<()> {
        let config = self.load_config()?;
        self.output_message(&json!({
            "type": "CONFIG",
            "config": config.redacted()
        }));
        Ok(())
    }

    fn output_report(&self, report: &StageReport) {
        self.output_message(&json!({
            "type": "REPORT",
            "report": {
                "stage": report.stage,
                "succeeded": report.succeeded(),
                "skipped": report.skipped(),
                "failed": report.failed(),
                "items": report.items
            }
        }));
    }

    fn log(&self, level: &str, message: String) {
        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": level,
                "message": message
            }
        }));
    }

    /// Output a message to stdout
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

//! Pipeline orchestrator
//!
//! Runs `Download -> Upload -> WarehouseLoad -> TriggerTransform -> Done` as a
//! strict linear chain. Each stage starts only after its predecessor
//! completed; a stage error halts the run at that stage. Nothing is retried
//! or rolled back.

mod types;

pub use types::{PipelineState, RunReport, StageFailure};

use crate::clean::Cleaner;
use crate::config::{LoadTarget, PipelineConfig, ResourceDescriptor, RunOptions};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::manifest::Manifest;
use crate::storage::Bucket;
use crate::transform::{DbtCloudTrigger, TransformRun, TransformTrigger};
use crate::types::{ItemOutcome, Stage, StageReport};
use crate::upload::Uploader;
use crate::warehouse::{RedshiftWarehouse, WarehouseLoader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Sequences the pipeline stages over explicitly constructed components
pub struct Orchestrator {
    name: String,
    resources: Vec<ResourceDescriptor>,
    targets: Vec<LoadTarget>,
    options: RunOptions,
    fetcher: Fetcher,
    uploader: Uploader,
    loader: WarehouseLoader,
    transform: Arc<dyn TransformTrigger>,
}

impl Orchestrator {
    pub fn new(
        config: &PipelineConfig,
        fetcher: Fetcher,
        uploader: Uploader,
        loader: WarehouseLoader,
        transform: Arc<dyn TransformTrigger>,
    ) -> Self {
        Self {
            name: config.name.clone(),
            resources: config.resources.clone(),
            targets: config.load.clone(),
            options: config.run.clone(),
            fetcher,
            uploader,
            loader,
            transform,
        }
    }

    /// Build production components: S3 bucket, Redshift, dbt Cloud.
    ///
    /// Fails before any stage runs if a required value is missing.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let fetcher = Fetcher::from_settings(&config.http, config.paths.staging_dir())?;
        let bucket = Bucket::from_config(&config.bucket)?;
        let loader = WarehouseLoader::new(
            Arc::new(RedshiftWarehouse::from_config(&config.warehouse)?),
            bucket.name(),
            config.warehouse.require_iam_role()?,
        );
        let uploader = Uploader::new(bucket, Cleaner::new(config.paths.clean_dir()));
        let transform = DbtCloudTrigger::from_config(&config.transform)?;

        Ok(Self::new(
            config,
            fetcher,
            uploader,
            loader,
            Arc::new(transform),
        ))
    }

    /// Run every stage in order
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::new(&self.name);
        let mut manifest = Manifest::new();

        info!("Starting pipeline {}", self.name);

        while let Some(stage) = report.state.stage() {
            info!("Stage {stage} started");

            let result = match stage {
                Stage::Download => self.download(&mut manifest).await,
                Stage::Upload => self.upload(&mut manifest).await,
                Stage::WarehouseLoad => self.load(&manifest).await,
                Stage::TriggerTransform => self.trigger_transform(&mut report.transform).await,
            };

            match result {
                Ok(stage_report) => {
                    let failed = stage_report.failed();
                    info!("Stage finished, {}", stage_report.summary());
                    report.stages.push(stage_report);

                    if failed > 0 && self.options.halt_on_item_failure {
                        error!("Halting pipeline at {stage}: {failed} item(s) failed");
                        report.halt(stage, format!("{failed} item(s) failed"));
                        return report;
                    }
                    report.state = report.state.next();
                }
                Err(e) => {
                    error!("Halting pipeline at {stage}: {e}");
                    report.halt(stage, e.to_string());
                    return report;
                }
            }
        }

        report.finish();
        info!("Pipeline {} finished", self.name);
        report
    }

    async fn download(&self, manifest: &mut Manifest) -> Result<StageReport> {
        let output = self.fetcher.fetch_all(&self.resources).await?;
        manifest.staged = output.produced;
        Ok(output.report)
    }

    /// Uploads exactly the files staged in this run
    async fn upload(&self, manifest: &mut Manifest) -> Result<StageReport> {
        let files: Vec<PathBuf> = manifest.staged.iter().map(|s| s.path.clone()).collect();
        let output = self.uploader.upload_files(&files).await?;
        manifest.uploaded = output.produced;
        Ok(output.report)
    }

    async fn load(&self, manifest: &Manifest) -> Result<StageReport> {
        let output = self.loader.load_all(&self.targets, Some(manifest)).await?;
        Ok(output.report)
    }

    async fn trigger_transform(&self, slot: &mut Option<TransformRun>) -> Result<StageReport> {
        let run = self.transform.run().await?;
        let mut report = StageReport::new(Stage::TriggerTransform.as_str());
        report.record(
            "transform",
            ItemOutcome::succeeded(format!("run {} {}", run.run_id, run.state)),
        );
        *slot = Some(run);
        Ok(report)
    }
}

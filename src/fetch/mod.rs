//! Fetcher
//!
//! Downloads each configured resource into the staging directory as
//! `<name>.csv`. A failed download is recorded and logged; the batch
//! continues with the next resource.

use crate::config::{HttpSettings, ResourceDescriptor};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig};
use crate::manifest::StagedFile;
use crate::types::{ItemOutcome, Stage, StageOutput};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Downloads remote CSV resources into a staging directory
#[derive(Debug)]
pub struct Fetcher {
    client: HttpClient,
    staging_dir: PathBuf,
}

impl Fetcher {
    /// Create a fetcher with an existing client
    pub fn new(client: HttpClient, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            staging_dir: staging_dir.into(),
        }
    }

    /// Create a fetcher from HTTP settings
    pub fn from_settings(settings: &HttpSettings, staging_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = HttpClient::with_config(HttpClientConfig::from(settings))?;
        Ok(Self::new(client, staging_dir))
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Download every resource in order.
    ///
    /// Only failing to create the staging directory is a stage error.
    pub async fn fetch_all(
        &self,
        resources: &[ResourceDescriptor],
    ) -> Result<StageOutput<StagedFile>> {
        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|e| {
                Error::stage(
                    Stage::Download.as_str(),
                    format!(
                        "cannot create staging directory {}: {e}",
                        self.staging_dir.display()
                    ),
                )
            })?;

        let mut output = StageOutput::new(Stage::Download.as_str());

        for resource in resources {
            match self.fetch_one(resource).await {
                Ok(staged) => {
                    info!(
                        "Successfully downloaded and saved: {}",
                        staged.path.display()
                    );
                    output.report.record(
                        &resource.name,
                        ItemOutcome::succeeded(staged.path.display().to_string()),
                    );
                    output.produced.push(staged);
                }
                Err(e) => {
                    warn!("Failed to download {} from {}: {e}", resource.name, resource.url);
                    output
                        .report
                        .record(&resource.name, ItemOutcome::failed(&e));
                }
            }
        }

        info!("{}", output.report.summary());
        Ok(output)
    }

    /// Download one resource, overwriting any previous staged copy
    pub async fn fetch_one(&self, resource: &ResourceDescriptor) -> Result<StagedFile> {
        let response = self.client.get(&resource.url).await?;
        let body = response.bytes().await?;

        let path = self
            .staging_dir
            .join(StagedFile::file_name_for(&resource.name));
        tokio::fs::write(&path, &body).await?;

        Ok(StagedFile {
            resource: resource.name.clone(),
            path,
        })
    }
}

//! Truncate-then-load of each mapped object

use super::statements::{copy_statement, truncate_statement};
use super::Warehouse;
use crate::config::LoadTarget;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::types::{ItemOutcome, Stage, StageOutput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A table that was replaced from an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedTable {
    pub table: String,
    pub object: String,
}

/// Loads uploaded objects into warehouse tables
#[derive(Clone)]
pub struct WarehouseLoader {
    warehouse: Arc<dyn Warehouse>,
    bucket: String,
    iam_role: String,
}

impl std::fmt::Debug for WarehouseLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseLoader")
            .field("bucket", &self.bucket)
            .field("iam_role", &self.iam_role)
            .finish_non_exhaustive()
    }
}

impl WarehouseLoader {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        bucket: impl Into<String>,
        iam_role: impl Into<String>,
    ) -> Self {
        Self {
            warehouse,
            bucket: bucket.into(),
            iam_role: iam_role.into(),
        }
    }

    /// Load every target in order.
    ///
    /// With a manifest, targets whose object was not uploaded in this run
    /// are skipped. Each target gets its own connection; a failure is
    /// recorded and the next target is attempted.
    pub async fn load_all(
        &self,
        targets: &[LoadTarget],
        manifest: Option<&Manifest>,
    ) -> Result<StageOutput<LoadedTable>> {
        let mut output = StageOutput::new(Stage::WarehouseLoad.as_str());

        for target in targets {
            if let Some(manifest) = manifest {
                if !manifest.has_object(&target.object) {
                    warn!(
                        "Skipping {}: {} was not uploaded in this run",
                        target.table, target.object
                    );
                    output.report.record(
                        &target.table,
                        ItemOutcome::skipped(format!("{} not uploaded", target.object)),
                    );
                    continue;
                }
            }

            info!(
                "Copying {} to Redshift table '{}'",
                target.object, target.table
            );
            match self.load_one(target).await {
                Ok(()) => {
                    info!("{} loaded into {}", target.object, target.table);
                    output.report.record(
                        &target.table,
                        ItemOutcome::succeeded(format!("s3://{}/{}", self.bucket, target.object)),
                    );
                    output.produced.push(LoadedTable {
                        table: target.table.clone(),
                        object: target.object.clone(),
                    });
                }
                Err(e) => {
                    error!("Failed to load {}: {e}", target.object);
                    output.report.record(&target.table, ItemOutcome::failed(&e));
                }
            }
        }

        info!("{}", output.report.summary());
        Ok(output)
    }

    /// Truncate then copy one table on a fresh connection.
    ///
    /// Database failures come back as [`Error::Warehouse`] naming the table.
    pub async fn load_one(&self, target: &LoadTarget) -> Result<()> {
        let truncate = truncate_statement(&target.table)?;
        let copy = copy_statement(&target.table, &self.bucket, &target.object, &self.iam_role)?;
        let for_table = |e: Error| match e {
            Error::Database(db) => Error::warehouse(&target.table, db.to_string()),
            other => other,
        };

        let mut session = self.warehouse.connect().await.map_err(for_table)?;
        let mut result = session.execute(&truncate).await;
        if result.is_ok() {
            result = session.execute(&copy).await;
        }

        if let Err(e) = session.close().await {
            warn!("Error closing connection for {}: {e}", target.table);
        }
        result.map_err(for_table)
    }
}

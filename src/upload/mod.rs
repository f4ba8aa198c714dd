//! Uploader
//!
//! Walks a local directory tree, cleans every regular file and puts the
//! cleaned copy into the bucket under its base file name. No failure aborts
//! the walk.

use crate::clean::Cleaner;
use crate::error::{Error, Result};
use crate::manifest::UploadedObject;
use crate::storage::Bucket;
use crate::types::{ItemOutcome, Stage, StageOutput};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Cleans and uploads files to one bucket
#[derive(Debug, Clone)]
pub struct Uploader {
    bucket: Bucket,
    cleaner: Cleaner,
}

impl Uploader {
    pub fn new(bucket: Bucket, cleaner: Cleaner) -> Self {
        Self { bucket, cleaner }
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Upload every regular file under `root`, sorted by file name
    pub async fn upload_dir(&self, root: &Path) -> Result<StageOutput<UploadedObject>> {
        if !root.is_dir() {
            return Err(Error::stage(
                Stage::Upload.as_str(),
                format!("directory {} does not exist", root.display()),
            ));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry under {}: {e}", root.display()),
            }
        }

        self.upload_files(&files).await
    }

    /// Clean and upload each file in order
    pub async fn upload_files(&self, files: &[PathBuf]) -> Result<StageOutput<UploadedObject>> {
        let mut output = StageOutput::new(Stage::Upload.as_str());

        for path in files {
            let item = path.display().to_string();
            match self.upload_one(path).await {
                Ok(object) => {
                    info!(
                        "Successfully uploaded {} to {}",
                        object.key,
                        self.bucket.uri(&object.key)
                    );
                    output
                        .report
                        .record(&item, ItemOutcome::succeeded(self.bucket.uri(&object.key)));
                    output.produced.push(object);
                }
                Err(e) => {
                    log_upload_failure(path, &e);
                    output.report.record(&item, ItemOutcome::failed(&e));
                }
            }
        }

        info!("{}", output.report.summary());
        Ok(output)
    }

    async fn upload_one(&self, path: &Path) -> Result<UploadedObject> {
        let cleaned = self.cleaner.clean(path)?;
        self.bucket.put_file(&cleaned.path, &cleaned.file_name).await?;
        Ok(UploadedObject {
            key: cleaned.file_name,
            source: cleaned.path,
        })
    }
}

fn log_upload_failure(path: &Path, err: &Error) {
    match err {
        Error::FileNotFound { path } => {
            error!("The file {path} does not exist in the local directory")
        }
        Error::StorageRejected { key, message } => {
            error!("Upload of {key} was rejected by the storage provider: {message}")
        }
        Error::MissingCredentials => {
            error!("AWS credentials not found, cannot upload {}", path.display())
        }
        Error::IncompleteCredentials { missing } => {
            error!(
                "Incomplete AWS credentials ({missing} not set), cannot upload {}",
                path.display()
            )
        }
        other => error!("Failed to upload {}: {other}", path.display()),
    }
}

#[cfg(test)]
mod tests;

//! Typed hand-off records passed between pipeline stages
//!
//! The file naming contract (`<name>.csv` staged, `<stem>_cleaned.csv`
//! cleaned, object key = cleaned file name) is produced in exactly one place,
//! here, and every downstream stage consumes these records instead of
//! re-deriving names from strings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix appended to a staged file's stem when cleaned
pub const CLEANED_SUFFIX: &str = "_cleaned";

/// A downloaded, not yet cleaned file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// Logical resource name
    pub resource: String,
    /// Local path inside the staging directory
    pub path: PathBuf,
}

impl StagedFile {
    /// Staged file name for a logical resource
    pub fn file_name_for(resource: &str) -> String {
        format!("{resource}.csv")
    }
}

/// A cleaned copy of a staged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedFile {
    /// Path of the file that was cleaned
    pub source: PathBuf,
    /// Path of the cleaned output
    pub path: PathBuf,
    /// Base name of the cleaned output, also its object key
    pub file_name: String,
    /// Data rows kept
    pub rows_kept: usize,
    /// Data rows dropped for a field-count mismatch
    pub rows_dropped: usize,
}

impl CleanedFile {
    /// Cleaned file name for a source path: `<stem>_cleaned.csv`
    pub fn file_name_for(source: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{stem}{CLEANED_SUFFIX}.csv")
    }
}

/// An object written to the bucket during this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
    /// Object key (flat namespace)
    pub key: String,
    /// Local file that was uploaded
    pub source: PathBuf,
}

/// Everything the pipeline produced so far in a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub staged: Vec<StagedFile>,
    pub uploaded: Vec<UploadedObject>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an object key was uploaded in this run
    pub fn has_object(&self, key: &str) -> bool {
        self.uploaded.iter().any(|o| o.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_contract() {
        assert_eq!(StagedFile::file_name_for("routes"), "routes.csv");
        assert_eq!(
            CleanedFile::file_name_for(Path::new("data/raw/trips_1_day.csv")),
            "trips_1_day_cleaned.csv"
        );
        assert_eq!(
            CleanedFile::file_name_for(Path::new("notes.txt")),
            "notes_cleaned.csv"
        );
    }

    #[test]
    fn test_manifest_has_object() {
        let mut manifest = Manifest::new();
        manifest.uploaded.push(UploadedObject {
            key: "routes_cleaned.csv".to_string(),
            source: PathBuf::from("data/clean/routes_cleaned.csv"),
        });
        assert!(manifest.has_object("routes_cleaned.csv"));
        assert!(!manifest.has_object("junctions_cleaned.csv"));
    }
}

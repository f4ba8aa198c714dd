//! Cleaner
//!
//! Validates and normalizes a staged CSV file:
//! - every header field is trimmed
//! - every data field is trimmed
//! - rows whose field count differs from the header's are dropped and logged
//!
//! Parsing is quote-aware, so `"Dublin, City"` is one field. Output is
//! `\n`-terminated and quoted only where necessary, which makes cleaning
//! idempotent.

use crate::error::{Error, Result};
use crate::manifest::CleanedFile;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A data row dropped during cleaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// 1-based line number in the source file
    pub line: u64,
    /// Number of fields found (0 when the row could not be decoded)
    pub fields: usize,
    /// Row content as parsed, comma-joined
    pub raw: String,
}

/// Counts from one cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub header_fields: usize,
    pub kept: usize,
    pub dropped: Vec<DroppedRow>,
}

/// Clean CSV from `input` into `output`.
///
/// Returns [`Error::EmptyFile`] (with an empty path) if there is no header row.
pub fn clean_csv<R: Read, W: Write>(input: R, output: W) -> Result<CleanStats> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(output);

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => {
            return Err(Error::EmptyFile {
                path: String::new(),
            })
        }
    };

    let expected = header.len();
    writer.write_record(&header)?;

    let mut stats = CleanStats {
        header_fields: expected,
        ..CleanStats::default()
    };

    for result in records {
        match result {
            Ok(record) if record.len() == expected => {
                writer.write_record(&record)?;
                stats.kept += 1;
            }
            Ok(record) => {
                let dropped = DroppedRow {
                    line: record.position().map_or(0, csv::Position::line),
                    fields: record.len(),
                    raw: record.iter().collect::<Vec<_>>().join(","),
                };
                warn!(
                    "Skipping malformed line {} ({} fields, expected {expected}): {}",
                    dropped.line, dropped.fields, dropped.raw
                );
                stats.dropped.push(dropped);
            }
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                let line = e.position().map_or(0, csv::Position::line);
                warn!("Skipping undecodable line {line}: {e}");
                stats.dropped.push(DroppedRow {
                    line,
                    fields: 0,
                    raw: String::new(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    writer.flush()?;
    Ok(stats)
}

/// Writes cleaned copies of staged files into a clean-output directory
#[derive(Debug, Clone)]
pub struct Cleaner {
    clean_dir: PathBuf,
}

impl Cleaner {
    pub fn new(clean_dir: impl Into<PathBuf>) -> Self {
        Self {
            clean_dir: clean_dir.into(),
        }
    }

    pub fn clean_dir(&self) -> &Path {
        &self.clean_dir
    }

    /// Clean one file into `<clean_dir>/<stem>_cleaned.csv`.
    ///
    /// Callers log the error and move on; nothing is left behind on failure.
    pub fn clean(&self, source: &Path) -> Result<CleanedFile> {
        let input = File::open(source).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound {
                path: source.display().to_string(),
            },
            _ => Error::Io(e),
        })?;

        fs::create_dir_all(&self.clean_dir)?;

        let file_name = CleanedFile::file_name_for(source);
        let path = self.clean_dir.join(&file_name);
        let output = File::create(&path)?;

        let stats = match clean_csv(input, output) {
            Ok(stats) => stats,
            Err(e) => {
                let _ = fs::remove_file(&path);
                return Err(match e {
                    Error::EmptyFile { .. } => Error::EmptyFile {
                        path: source.display().to_string(),
                    },
                    other => other,
                });
            }
        };

        debug!(
            "Cleaned {} -> {} ({} kept, {} dropped)",
            source.display(),
            path.display(),
            stats.kept,
            stats.dropped.len()
        );

        Ok(CleanedFile {
            source: source.to_path_buf(),
            path,
            file_name,
            rows_kept: stats.kept,
            rows_dropped: stats.dropped.len(),
        })
    }
}

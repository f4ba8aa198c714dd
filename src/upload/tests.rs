//! Tests for the uploader

use super::*;
use crate::storage::Credentials;
use crate::types::FailureKind;
use object_store::memory::InMemory;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, Uploader) {
    let dir = tempdir().unwrap();
    let bucket = Bucket::from_store("dublin-trips-data-lake", Arc::new(InMemory::new()));
    let uploader = Uploader::new(bucket, Cleaner::new(dir.path().join("clean")));
    (dir, uploader)
}

fn write_raw(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let raw = dir.path().join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    let path = raw.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_upload_dir_cleans_and_puts_each_file() {
    let (dir, uploader) = setup();
    write_raw(&dir, "routes.csv", "route, link\n1,A\n2\n");
    write_raw(&dir, "junctions.csv", "id,name\n7,\"Dublin, City\"\n");

    let output = uploader.upload_dir(&dir.path().join("raw")).await.unwrap();

    let keys: Vec<&str> = output.produced.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["junctions_cleaned.csv", "routes_cleaned.csv"]);
    assert_eq!(output.report.succeeded(), 2);

    let routes = uploader.bucket().get("routes_cleaned.csv").await.unwrap();
    assert_eq!(&routes[..], b"route,link\n1,A\n");
}

#[tokio::test]
async fn test_nested_files_use_base_name() {
    let (dir, uploader) = setup();
    let nested = dir.path().join("raw").join("2024");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("trips_1_day.csv"), "a,b\n1,2\n").unwrap();

    let output = uploader.upload_dir(&dir.path().join("raw")).await.unwrap();
    assert_eq!(output.produced.len(), 1);
    assert_eq!(output.produced[0].key, "trips_1_day_cleaned.csv");
}

#[tokio::test]
async fn test_missing_file_does_not_stop_batch() {
    let (dir, uploader) = setup();
    let present = write_raw(&dir, "routes.csv", "a,b\n1,2\n");
    let missing = dir.path().join("raw").join("junctions.csv");

    let output = uploader
        .upload_files(&[missing.clone(), present.clone()])
        .await
        .unwrap();

    let missing_outcome = output.report.outcome(&missing.display().to_string()).unwrap();
    assert_eq!(missing_outcome.failure_kind(), Some(FailureKind::MissingFile));
    assert!(output
        .report
        .outcome(&present.display().to_string())
        .unwrap()
        .is_succeeded());
}

#[tokio::test]
async fn test_missing_credentials_reported_per_file() {
    let dir = tempdir().unwrap();
    let bucket = Bucket::from_store("b", Arc::new(InMemory::new()))
        .with_credentials(Credentials::Missing);
    let uploader = Uploader::new(bucket, Cleaner::new(dir.path().join("clean")));
    write_raw(&dir, "routes.csv", "a,b\n1,2\n");
    write_raw(&dir, "junctions.csv", "a,b\n1,2\n");

    let output = uploader.upload_dir(&dir.path().join("raw")).await.unwrap();

    assert_eq!(output.report.failed(), 2);
    assert!(output.produced.is_empty());
    for item in &output.report.items {
        assert_eq!(
            item.outcome.failure_kind(),
            Some(FailureKind::MissingCredentials)
        );
    }
}

#[tokio::test]
async fn test_incomplete_credentials() {
    let dir = tempdir().unwrap();
    let bucket = Bucket::from_store("b", Arc::new(InMemory::new())).with_credentials(
        Credentials::Incomplete {
            missing: "AWS_SECRET_ACCESS_KEY",
        },
    );
    let uploader = Uploader::new(bucket, Cleaner::new(dir.path().join("clean")));
    write_raw(&dir, "routes.csv", "a,b\n1,2\n");

    let output = uploader.upload_dir(&dir.path().join("raw")).await.unwrap();
    assert_eq!(
        output.report.items[0].outcome.failure_kind(),
        Some(FailureKind::IncompleteCredentials)
    );
}

#[tokio::test]
async fn test_empty_file_is_reported_and_skipped() {
    let (dir, uploader) = setup();
    write_raw(&dir, "empty.csv", "");
    write_raw(&dir, "routes.csv", "a,b\n1,2\n");

    let output = uploader.upload_dir(&dir.path().join("raw")).await.unwrap();
    assert_eq!(output.report.failed(), 1);
    assert_eq!(output.report.succeeded(), 1);
    assert_eq!(
        output.report.items[0].outcome.failure_kind(),
        Some(FailureKind::Malformed)
    );
}

#[tokio::test]
async fn test_missing_root_is_stage_error() {
    let (dir, uploader) = setup();
    let err = uploader
        .upload_dir(&dir.path().join("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StageFailed { .. }));
}

#[tokio::test]
async fn test_reupload_overwrites() {
    let (dir, uploader) = setup();
    let path = write_raw(&dir, "routes.csv", "a,b\n1,2\n");
    uploader.upload_dir(&dir.path().join("raw")).await.unwrap();

    std::fs::write(&path, "a,b\n3,4\n").unwrap();
    uploader.upload_dir(&dir.path().join("raw")).await.unwrap();

    let data = uploader.bucket().get("routes_cleaned.csv").await.unwrap();
    assert_eq!(&data[..], b"a,b\n3,4\n");
}

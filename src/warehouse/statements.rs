//! SQL statement builders
//!
//! Table names, object keys and role ARNs are interpolated into SQL text, so
//! every value is checked before it reaches a statement.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// `table` or `schema.table`
static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(?:\.[A-Za-z_][A-Za-z0-9_$]*)?$").unwrap()
});

/// Flat object key: no separators, quotes or whitespace
static OBJECT_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").unwrap());

/// `arn:aws:iam::<account>:role/<name>`
static ROLE_ARN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-z\-]*:iam::[0-9]{12}:role/[A-Za-z0-9+=,.@_/\-]+$").unwrap()
});

/// Bucket names per S3 naming rules
static BUCKET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.\-]{1,61}[a-z0-9]$").unwrap());

pub fn validate_identifier(name: &str) -> Result<()> {
    if IDENTIFIER_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(Error::invalid_value(
            "table",
            format!("'{name}' is not a valid table identifier"),
        ))
    }
}

pub fn validate_object_key(key: &str) -> Result<()> {
    if OBJECT_KEY_REGEX.is_match(key) {
        Ok(())
    } else {
        Err(Error::invalid_value(
            "object",
            format!("'{key}' is not a valid object key"),
        ))
    }
}

fn validate_role(role: &str) -> Result<()> {
    if ROLE_ARN_REGEX.is_match(role) {
        Ok(())
    } else {
        Err(Error::invalid_value(
            "IAM_ROLE_ARN",
            format!("'{role}' is not an IAM role ARN"),
        ))
    }
}

fn validate_bucket(bucket: &str) -> Result<()> {
    if BUCKET_REGEX.is_match(bucket) {
        Ok(())
    } else {
        Err(Error::invalid_value(
            "S3_BUCKET",
            format!("'{bucket}' is not a valid bucket name"),
        ))
    }
}

/// `TRUNCATE TABLE <table>;`
pub fn truncate_statement(table: &str) -> Result<String> {
    validate_identifier(table)?;
    Ok(format!("TRUNCATE TABLE {table};"))
}

/// Bulk-copy statement for one object into one table
pub fn copy_statement(table: &str, bucket: &str, key: &str, iam_role: &str) -> Result<String> {
    validate_identifier(table)?;
    validate_bucket(bucket)?;
    validate_object_key(key)?;
    validate_role(iam_role)?;
    Ok(format!(
        "COPY {table} FROM 's3://{bucket}/{key}' IAM_ROLE '{iam_role}' FORMAT AS CSV IGNOREHEADER 1 DELIMITER ',';"
    ))
}

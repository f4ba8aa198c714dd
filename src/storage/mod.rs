//! Object storage module
//!
//! A bucket handle over `object_store`, created once per process and reused
//! for every upload. S3 in production; local filesystem and in-memory
//! stores for tests and dry runs.

mod bucket;
mod credentials;

pub use bucket::Bucket;
pub use credentials::{resolve_credentials, Credentials};

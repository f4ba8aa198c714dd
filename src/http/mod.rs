//! HTTP client module
//!
//! Provides the HTTP client shared by the fetcher and the transform trigger.
//!
//! # Features
//!
//! - **Optional Retries**: Configurable retry count, off unless `http.retries` is set
//! - **Backoff Strategies**: Constant, linear, and exponential, picked in `http.backoff`
//! - **Error Classification**: Non-success statuses and bad JSON surface as typed errors

mod client;

pub use client::{HttpClient, HttpClientConfig};

#[cfg(test)]
mod tests;

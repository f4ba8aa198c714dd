//! Bucket handle

use super::credentials::{resolve_credentials, Credentials};
use crate::config::BucketConfig;
use crate::error::{Error, Result};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A single bucket, addressed with flat keys
#[derive(Debug, Clone)]
pub struct Bucket {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Bucket name
    name: String,
    /// URL scheme for logging and COPY paths
    scheme: String,
    /// Credential state, checked before each write
    credentials: Credentials,
}

impl Bucket {
    /// Build an S3 bucket from config.
    ///
    /// Starts from the ambient AWS environment, so an instance or container
    /// role is used when no keys are configured. Missing or incomplete
    /// credentials do not fail here; they fail each upload so every file
    /// reports the problem.
    pub fn from_config(config: &BucketConfig) -> Result<Self> {
        let name = config.require_name()?;
        let credentials = resolve_credentials(config);

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(name)
            .with_region(&config.region);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        if let Credentials::Static {
            access_key_id,
            secret_access_key,
            session_token,
        } = &credentials
        {
            builder = builder
                .with_access_key_id(access_key_id)
                .with_secret_access_key(secret_access_key);
            if let Some(token) = session_token {
                builder = builder.with_token(token);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            name: name.to_string(),
            scheme: "s3".to_string(),
            credentials,
        })
    }

    /// Use a local directory as the bucket
    pub fn local(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            Error::config(format!(
                "Failed to create directory {}: {e}",
                path.display()
            ))
        })?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            name: path.display().to_string(),
            scheme: "file".to_string(),
            credentials: Credentials::NotRequired,
        })
    }

    /// Wrap an existing store
    pub fn from_store(name: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            name: name.into(),
            scheme: "s3".to_string(),
            credentials: Credentials::NotRequired,
        }
    }

    /// Override the credential state
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Full URI of a key, e.g. `s3://bucket/routes_cleaned.csv`
    pub fn uri(&self, key: &str) -> String {
        format!("{}://{}/{key}", self.scheme, self.name.trim_end_matches('/'))
    }

    /// Upload a local file under `key`, overwriting any existing object
    pub async fn put_file(&self, local: &Path, key: &str) -> Result<String> {
        self.credentials.check()?;

        let data = tokio::fs::read(local).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: local.display().to_string(),
            },
            _ => Error::Io(e),
        })?;

        self.put(key, Bytes::from(data)).await
    }

    /// Write bytes under `key`
    pub async fn put(&self, key: &str, data: Bytes) -> Result<String> {
        self.credentials.check()?;

        let path = ObjectPath::from(key);
        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| self.put_error(key, &e.to_string()))?;

        let uri = self.uri(key);
        debug!("Wrote {uri}");
        Ok(uri)
    }

    /// An empty ambient chain only shows up when the first request is signed
    fn put_error(&self, key: &str, message: &str) -> Error {
        let no_credentials = matches!(self.credentials, Credentials::Instance)
            && message.to_ascii_lowercase().contains("credential");
        if no_credentials {
            Error::MissingCredentials
        } else {
            Error::rejected(key, message)
        }
    }

    /// Read an object back
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = ObjectPath::from(key);
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| Error::rejected(key, e.to_string()))?;
        result
            .bytes()
            .await
            .map_err(|e| Error::rejected(key, e.to_string()))
    }
}

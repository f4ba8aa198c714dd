//! Credential resolution for the S3 bucket

use crate::config::BucketConfig;
use crate::error::{Error, Result};

/// Resolved credential state
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Static key pair (and optional session token)
    Static {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// No keys; use instance/container metadata credentials
    Instance,
    /// Store does not need credentials (local, in-memory)
    NotRequired,
    /// Nothing configured
    Missing,
    /// Only part of a key pair configured
    Incomplete { missing: &'static str },
}

impl Credentials {
    /// Error to report when uploading with these credentials, if any
    pub fn check(&self) -> Result<()> {
        match self {
            Self::Missing => Err(Error::MissingCredentials),
            Self::Incomplete { missing } => Err(Error::IncompleteCredentials {
                missing: (*missing).to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static { access_key_id, .. } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .finish_non_exhaustive(),
            Self::Instance => f.write_str("Instance"),
            Self::NotRequired => f.write_str("NotRequired"),
            Self::Missing => f.write_str("Missing"),
            Self::Incomplete { missing } => f
                .debug_struct("Incomplete")
                .field("missing", missing)
                .finish(),
        }
    }
}

/// Resolve credentials from bucket config
pub fn resolve_credentials(config: &BucketConfig) -> Credentials {
    let key = config.access_key_id.as_deref().filter(|s| !s.is_empty());
    let secret = config.secret_access_key.as_deref().filter(|s| !s.is_empty());
    let token = config.session_token.as_deref().filter(|s| !s.is_empty());

    match (key, secret) {
        (Some(key), Some(secret)) => Credentials::Static {
            access_key_id: key.to_string(),
            secret_access_key: secret.to_string(),
            session_token: token.map(String::from),
        },
        (Some(_), None) => Credentials::Incomplete {
            missing: "AWS_SECRET_ACCESS_KEY",
        },
        (None, Some(_)) => Credentials::Incomplete {
            missing: "AWS_ACCESS_KEY_ID",
        },
        (None, None) if token.is_some() => Credentials::Incomplete {
            missing: "AWS_ACCESS_KEY_ID",
        },
        (None, None) if config.allow_instance_credentials => Credentials::Instance,
        (None, None) => Credentials::Missing,
    }
}

//! HTTP client with optional retry
//!
//! One client per caller: the fetcher downloads raw files with it, the
//! transform trigger talks JSON to dbt Cloud. Non-success statuses surface
//! as [`Error::HttpStatus`] once retries run out.

use crate::config::HttpSettings;
use crate::error::{Error, Result};
use crate::types::BackoffType;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Prefix for relative request paths
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Retries after the first attempt (0 = single attempt)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on any retry delay
    pub max_backoff: Duration,
    /// How the delay grows between retries
    pub backoff_type: BackoffType,
    /// Headers sent with every request
    pub default_headers: HashMap<String, String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&HttpSettings::default())
    }
}

impl From<&HttpSettings> for HttpClientConfig {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            base_url: None,
            timeout: settings.timeout(),
            max_retries: settings.retries,
            initial_backoff: settings.initial_backoff(),
            max_backoff: settings.max_backoff(),
            backoff_type: settings.backoff,
            default_headers: HashMap::new(),
        }
    }
}

impl HttpClientConfig {
    /// Set the base URL for relative paths
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add a header sent with every request
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

/// HTTP client with optional retry
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

// Default headers may carry tokens
impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("max_retries", &self.config.max_retries)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("dublintrips-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// GET a URL or path
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(Method::GET, url, None).await
    }

    /// GET and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        decode(self.send(Method::GET, url, None).await?).await
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T> {
        decode(self.send(Method::POST, url, Some(&body)).await?).await
    }

    /// Send with retries on 429/5xx, timeouts and connect errors
    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response> {
        let url = self.build_url(url);
        let attempts = self.config.max_retries.saturating_add(1);

        for attempt in 0..attempts {
            let last = attempt + 1 == attempts;
            let reason = match self.send_once(&method, &url, body).await {
                Ok(response) if response.status().is_success() => {
                    debug!("{method} {url} -> {}", response.status());
                    return Ok(response);
                }
                Ok(response) if !last && is_retryable_status(response.status()) => {
                    format!("HTTP {}", response.status().as_u16())
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let text = response.text().await.unwrap_or_default();
                    return Err(Error::http_status(status, text));
                }
                Err(e) if !last && (e.is_timeout() || e.is_connect()) => e.to_string(),
                Err(e) if e.is_timeout() => {
                    return Err(Error::Timeout {
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    })
                }
                Err(e) => return Err(Error::Http(e)),
            };

            let delay = self.calculate_backoff(attempt);
            warn!(
                "{method} {url} failed ({reason}), attempt {}/{attempts}, retrying in {delay:?}",
                attempt + 1
            );
            tokio::time::sleep(delay).await;
        }

        // The final attempt always returns from the match
        Err(Error::Other(format!("{method} {url}: no attempts made")))
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
    ) -> reqwest::Result<Response> {
        let mut request = self.client.request(method.clone(), url);
        for (key, value) in &self.config.default_headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }

    /// Absolute URLs pass through; paths join the base URL
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match &self.config.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let initial = self.config.initial_backoff;
        let delay = match self.config.backoff_type {
            BackoffType::Constant => initial,
            BackoffType::Linear => initial.saturating_mul(attempt + 1),
            BackoffType::Exponential => initial.saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.config.max_backoff)
    }
}

/// Read the whole body, then parse; a bad payload is not a network error
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

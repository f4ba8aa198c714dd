//! dbt Cloud v2 job runs

use super::{RunState, TransformRun, TransformTrigger};
use crate::config::TransformConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Triggers a dbt Cloud job by id and polls the run
#[derive(Debug)]
pub struct DbtCloudTrigger {
    client: HttpClient,
    account_id: String,
    job_id: String,
    cause: String,
    check_interval: Duration,
    timeout: Duration,
}

impl DbtCloudTrigger {
    /// Build a trigger from config. Account, token and job id are required.
    pub fn from_config(config: &TransformConfig) -> Result<Self> {
        let account_id = config.require_account_id()?;
        let token = config.require_api_token()?;
        let job_id = config.require_job_id()?;

        let client_config = HttpClientConfig::default()
            .with_base_url(&config.base_url)
            .with_header("Authorization", format!("Token {token}"))
            .with_header("Accept", "application/json");

        Ok(Self {
            client: HttpClient::with_config(client_config)?,
            account_id: account_id.to_string(),
            job_id: job_id.to_string(),
            cause: config.cause.clone(),
            check_interval: config.check_interval(),
            timeout: config.timeout(),
        })
    }

    /// Override polling cadence
    #[must_use]
    pub fn with_polling(mut self, check_interval: Duration, timeout: Duration) -> Self {
        self.check_interval = check_interval;
        self.timeout = timeout;
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Start a run and return its id
    pub async fn trigger(&self) -> Result<String> {
        let path = format!(
            "/api/v2/accounts/{}/jobs/{}/run/",
            self.account_id, self.job_id
        );
        let response: Value = self
            .client
            .post_json(&path, json!({ "cause": self.cause }))
            .await?;

        let run_id = match response.pointer("/data/id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => {
                return Err(Error::Other(format!(
                    "dbt Cloud response for job {} has no run id",
                    self.job_id
                )))
            }
        };

        info!("Triggered dbt Cloud job {} as run {run_id}", self.job_id);
        Ok(run_id)
    }

    /// Current status of a run
    pub async fn status(&self, run_id: &str) -> Result<RunState> {
        let path = format!("/api/v2/accounts/{}/runs/{run_id}/", self.account_id);
        let response: Value = self.client.get_json(&path).await?;

        let code = response
            .pointer("/data/status")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Other(format!("dbt Cloud run {run_id} has no status")))?;

        Ok(RunState::from_code(code))
    }

    /// Poll until the run is terminal or the timeout elapses
    pub async fn wait(&self, run_id: &str) -> Result<TransformRun> {
        let start = Instant::now();
        let mut polls = 0;

        loop {
            let state = self.status(run_id).await?;
            polls += 1;
            debug!("dbt Cloud run {run_id} is {state}");

            if state.is_terminal() {
                if state.is_success() {
                    info!("dbt Cloud run {run_id} succeeded");
                    return Ok(TransformRun {
                        run_id: run_id.to_string(),
                        state,
                        polls,
                    });
                }
                return Err(Error::TransformFailed {
                    run_id: run_id.to_string(),
                    status: state.to_string(),
                });
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                warn!(
                    "dbt Cloud run {run_id} still {state} after {}s",
                    self.timeout.as_secs()
                );
                return Err(Error::TransformTimeout {
                    run_id: run_id.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.check_interval.min(self.timeout - elapsed)).await;
        }
    }
}

#[async_trait]
impl TransformTrigger for DbtCloudTrigger {
    async fn run(&self) -> Result<TransformRun> {
        let run_id = self.trigger().await?;
        self.wait(&run_id).await
    }
}

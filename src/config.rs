//! Configuration types for pipeline definitions
//!
//! A pipeline is described in YAML (resources to fetch, object-to-table load
//! mapping, transform job). Hosts, secrets, the bucket name and the IAM role
//! are normally supplied through the process environment and overlaid on top
//! of the YAML by [`PipelineConfig::apply_env`].

use crate::error::{Error, Result};
use crate::types::BackoffType;
use crate::warehouse::{validate_identifier, validate_object_key};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Built-in Dublin TRIPS pipeline definition
pub const BUILTIN_PIPELINE: &str = include_str!("../pipelines/dublintrips.yaml");

const REDACTED: &str = "********";

// ============================================================================
// Top-Level Pipeline Config
// ============================================================================

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name, used in logs
    #[serde(default = "default_name")]
    pub name: String,

    /// Remote CSV resources to download, in order
    pub resources: Vec<ResourceDescriptor>,

    /// Object key to warehouse table mapping, in load order
    #[serde(default)]
    pub load: Vec<LoadTarget>,

    /// Local directories
    #[serde(default)]
    pub paths: PathsConfig,

    /// HTTP settings for the fetcher
    #[serde(default)]
    pub http: HttpSettings,

    /// Object storage bucket
    #[serde(default)]
    pub bucket: BucketConfig,

    /// Destination warehouse
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// External transformation job
    #[serde(default)]
    pub transform: TransformConfig,

    /// Orchestration options
    #[serde(default)]
    pub run: RunOptions,
}

fn default_name() -> String {
    "pipeline".to_string()
}

/// One downloadable dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Logical name; the staged file is `<name>.csv`
    pub name: String,
    /// Source URL
    pub url: String,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One entry of the upload mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTarget {
    /// Object key in the bucket
    pub object: String,
    /// Destination table
    pub table: String,
}

impl LoadTarget {
    pub fn new(object: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            table: table.into(),
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Local working directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root data directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Staging subdirectory for raw downloads
    #[serde(default = "default_staging")]
    pub staging: String,
    /// Output subdirectory for cleaned files
    #[serde(default = "default_clean")]
    pub clean: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_staging() -> String {
    "raw".to_string()
}

fn default_clean() -> String {
    "clean".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            staging: default_staging(),
            clean: default_clean(),
        }
    }
}

impl PathsConfig {
    /// Directory the fetcher writes to and the uploader walks
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join(&self.staging)
    }

    /// Directory cleaned files are written to
    pub fn clean_dir(&self) -> PathBuf {
        self.data_dir.join(&self.clean)
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP settings for downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    /// Retries per download (0 = single attempt)
    #[serde(default)]
    pub retries: u32,
    /// Delay growth between retries
    #[serde(default)]
    pub backoff: BackoffType,
    /// First retry delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Cap on any retry delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_http_timeout() -> u64 {
    30
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            retries: 0,
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// ============================================================================
// Bucket
// ============================================================================

/// Object storage bucket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Bucket name (`S3_BUCKET`)
    #[serde(default)]
    pub name: Option<String>,
    /// AWS region (`AWS_REGION`)
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores (`AWS_ENDPOINT`)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Access key id (`AWS_ACCESS_KEY_ID`)
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key (`AWS_SECRET_ACCESS_KEY`)
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Session token (`AWS_SESSION_TOKEN`)
    #[serde(default)]
    pub session_token: Option<String>,
    /// Fall back to the ambient credential chain (instance profile, container
    /// role, web identity) when no keys are set
    #[serde(default = "default_true")]
    pub allow_instance_credentials: bool,
}

fn default_true() -> bool {
    true
}

fn default_region() -> String {
    "eu-west-2".to_string()
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: None,
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            allow_instance_credentials: true,
        }
    }
}

impl BucketConfig {
    /// Bucket name or a missing-field error
    pub fn require_name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::missing_field("S3_BUCKET"))
    }
}

// ============================================================================
// Warehouse
// ============================================================================

/// Destination warehouse connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_warehouse_port")]
    pub port: u16,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// IAM role the warehouse assumes to read the bucket (`IAM_ROLE_ARN`)
    #[serde(default)]
    pub iam_role: Option<String>,
    /// Schema holding the transformed output tables
    #[serde(default = "default_schema")]
    pub schema: String,
    /// TLS mode: disable, prefer or require
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

fn default_warehouse_port() -> u16 {
    5439
}

fn default_schema() -> String {
    "prod".to_string()
}

fn default_ssl_mode() -> String {
    "prefer".to_string()
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_warehouse_port(),
            database: None,
            user: None,
            password: None,
            iam_role: None,
            schema: default_schema(),
            ssl_mode: default_ssl_mode(),
        }
    }
}

impl WarehouseConfig {
    pub fn require_host(&self) -> Result<&str> {
        require(self.host.as_deref(), "REDSHIFT_HOST")
    }

    pub fn require_database(&self) -> Result<&str> {
        require(self.database.as_deref(), "REDSHIFT_DB")
    }

    pub fn require_user(&self) -> Result<&str> {
        require(self.user.as_deref(), "REDSHIFT_USER")
    }

    pub fn require_iam_role(&self) -> Result<&str> {
        require(self.iam_role.as_deref(), "IAM_ROLE_ARN")
    }
}

// ============================================================================
// Transform
// ============================================================================

/// dbt Cloud job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// dbt Cloud base URL (`DBT_CLOUD_URL`)
    #[serde(default = "default_dbt_url")]
    pub base_url: String,
    /// Account id (`DBT_CLOUD_ACCOUNT_ID`)
    #[serde(default)]
    pub account_id: Option<String>,
    /// API token (`DBT_CLOUD_API_TOKEN`)
    #[serde(default)]
    pub api_token: Option<String>,
    /// Job to trigger (`DBT_CLOUD_JOB_ID`)
    #[serde(default)]
    pub job_id: Option<String>,
    /// Seconds between status polls
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Seconds to wait for the run before failing
    #[serde(default = "default_transform_timeout")]
    pub timeout_secs: u64,
    /// Cause string attached to the triggered run
    #[serde(default = "default_cause")]
    pub cause: String,
}

fn default_dbt_url() -> String {
    "https://cloud.getdbt.com".to_string()
}

fn default_check_interval() -> u64 {
    60
}

fn default_transform_timeout() -> u64 {
    300
}

fn default_cause() -> String {
    "Triggered by dublintrips pipeline".to_string()
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            base_url: default_dbt_url(),
            account_id: None,
            api_token: None,
            job_id: None,
            check_interval_secs: default_check_interval(),
            timeout_secs: default_transform_timeout(),
            cause: default_cause(),
        }
    }
}

impl TransformConfig {
    pub fn require_account_id(&self) -> Result<&str> {
        require(self.account_id.as_deref(), "DBT_CLOUD_ACCOUNT_ID")
    }

    pub fn require_api_token(&self) -> Result<&str> {
        require(self.api_token.as_deref(), "DBT_CLOUD_API_TOKEN")
    }

    pub fn require_job_id(&self) -> Result<&str> {
        require(self.job_id.as_deref(), "DBT_CLOUD_JOB_ID")
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Run Options
// ============================================================================

/// Orchestration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Treat a stage that finished with failed items as a failed stage
    #[serde(default)]
    pub halt_on_item_failure: bool,
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::missing_field(field))
}

// ============================================================================
// Loading
// ============================================================================

impl PipelineConfig {
    /// Load a pipeline from a file, or the built-in definition when `path` is `None`,
    /// then overlay the process environment and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_yaml(BUILTIN_PIPELINE)?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a pipeline definition file without environment overlay
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read pipeline file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline definition from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Overlay environment values. Set variables win over YAML.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(dir) = get("DUBLINTRIPS_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }

        if let Some(v) = get("S3_BUCKET") {
            self.bucket.name = Some(v);
        }
        if let Some(v) = get("AWS_REGION") {
            self.bucket.region = v;
        }
        if let Some(v) = get("AWS_ENDPOINT") {
            self.bucket.endpoint = Some(v);
        }
        if let Some(v) = get("AWS_ACCESS_KEY_ID") {
            self.bucket.access_key_id = Some(v);
        }
        if let Some(v) = get("AWS_SECRET_ACCESS_KEY") {
            self.bucket.secret_access_key = Some(v);
        }
        if let Some(v) = get("AWS_SESSION_TOKEN") {
            self.bucket.session_token = Some(v);
        }

        if let Some(v) = get("REDSHIFT_HOST") {
            self.warehouse.host = Some(v);
        }
        if let Some(port) = get("REDSHIFT_PORT") {
            self.warehouse.port = port.parse().map_err(|e| {
                Error::invalid_value("REDSHIFT_PORT", format!("'{port}' is not a port: {e}"))
            })?;
        }
        if let Some(v) = get("REDSHIFT_DB") {
            self.warehouse.database = Some(v);
        }
        if let Some(v) = get("REDSHIFT_USER") {
            self.warehouse.user = Some(v);
        }
        if let Some(v) = get("REDSHIFT_PASSWORD") {
            self.warehouse.password = Some(v);
        }
        if let Some(v) = get("IAM_ROLE_ARN") {
            self.warehouse.iam_role = Some(v);
        }

        if let Some(v) = get("DBT_CLOUD_URL") {
            self.transform.base_url = v;
        }
        if let Some(v) = get("DBT_CLOUD_ACCOUNT_ID") {
            self.transform.account_id = Some(v);
        }
        if let Some(v) = get("DBT_CLOUD_API_TOKEN") {
            self.transform.api_token = Some(v);
        }
        if let Some(v) = get("DBT_CLOUD_JOB_ID") {
            self.transform.job_id = Some(v);
        }
        Ok(())
    }

    /// Validate structure. Stage-specific required fields are checked lazily
    /// by the stage that needs them.
    pub fn validate(&self) -> Result<()> {
        if self.resources.is_empty() {
            return Err(Error::config("Pipeline must define at least one resource"));
        }

        let mut names = HashSet::new();
        for resource in &self.resources {
            if resource.name.is_empty()
                || resource.name.contains(['/', '\\'])
                || resource.name.starts_with('.')
            {
                return Err(Error::invalid_value(
                    "resources.name",
                    format!("'{}' is not a usable file name", resource.name),
                ));
            }
            if !names.insert(resource.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate resource name: {}",
                    resource.name
                )));
            }
            url::Url::parse(&resource.url).map_err(|e| {
                Error::invalid_value(
                    "resources.url",
                    format!("'{}' for '{}': {e}", resource.url, resource.name),
                )
            })?;
        }

        for target in &self.load {
            validate_object_key(&target.object)?;
            validate_identifier(&target.table)?;
        }
        validate_identifier(&self.warehouse.schema)?;

        let staging = normalize(&self.paths.staging_dir());
        let clean = normalize(&self.paths.clean_dir());
        if staging.starts_with(&clean) || clean.starts_with(&staging) {
            return Err(Error::config(format!(
                "Staging ({}) and clean ({}) directories must be separate, not the same or nested",
                staging.display(),
                clean.display()
            )));
        }

        if self.transform.check_interval_secs == 0 {
            return Err(Error::invalid_value(
                "transform.check_interval_secs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some(REDACTED.to_string());
            }
        };
        mask(&mut copy.bucket.secret_access_key);
        mask(&mut copy.bucket.session_token);
        mask(&mut copy.warehouse.password);
        mask(&mut copy.transform.api_token);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_builtin_pipeline_parses() {
        let config = PipelineConfig::from_yaml(BUILTIN_PIPELINE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.name, "dublintrips");
        let names: Vec<_> = config.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["trips_1_day", "routes", "junctions"]);
        assert_eq!(
            config.load[1],
            LoadTarget::new("routes_cleaned.csv", "routes")
        );
        assert_eq!(config.bucket.region, "eu-west-2");
        assert_eq!(config.warehouse.port, 5439);
        assert_eq!(config.transform.job_id.as_deref(), Some("70471823452790"));
        assert_eq!(config.transform.check_interval(), Duration::from_secs(60));
        assert_eq!(config.transform.timeout(), Duration::from_secs(300));
        assert!(!config.run.halt_on_item_failure);
    }

    #[test]
    fn test_env_overlay() {
        let mut config = PipelineConfig::from_yaml(BUILTIN_PIPELINE).unwrap();
        config.apply_env(env(&[
            ("DUBLINTRIPS_DATA_DIR", "/tmp/trips"),
            ("S3_BUCKET", "dublin-trips-data-lake"),
            ("REDSHIFT_HOST", "example.redshift.amazonaws.com"),
            ("REDSHIFT_PORT", "5440"),
            ("REDSHIFT_DB", "dev"),
            ("IAM_ROLE_ARN", "arn:aws:iam::123:role/redshift"),
            ("DBT_CLOUD_JOB_ID", "42"),
            ("AWS_REGION", ""),
        ]))
        .unwrap();

        assert_eq!(config.paths.staging_dir(), PathBuf::from("/tmp/trips/raw"));
        assert_eq!(config.paths.clean_dir(), PathBuf::from("/tmp/trips/clean"));
        assert_eq!(config.bucket.require_name().unwrap(), "dublin-trips-data-lake");
        assert_eq!(
            config.warehouse.require_host().unwrap(),
            "example.redshift.amazonaws.com"
        );
        assert_eq!(config.warehouse.port, 5440);
        assert_eq!(config.warehouse.require_database().unwrap(), "dev");
        assert_eq!(config.transform.require_job_id().unwrap(), "42");
        // Empty variables do not clobber YAML values
        assert_eq!(config.bucket.region, "eu-west-2");
    }

    #[test]
    fn test_env_rejects_unparsable_port() {
        let mut config = PipelineConfig::from_yaml(BUILTIN_PIPELINE).unwrap();
        let err = config
            .apply_env(env(&[("REDSHIFT_PORT", "54x9")]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfigValue { ref field, .. } if field == "REDSHIFT_PORT"
        ));
    }

    #[test]
    fn test_yaml_errors_are_parse_errors() {
        let err = PipelineConfig::from_yaml("resources: [").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_validate_rejects_nested_paths() {
        let base = "resources:\n  - name: routes\n    url: https://example.com/routes.csv\n";

        for paths in [
            "paths:\n  staging: raw\n  clean: raw/clean\n",
            "paths:\n  staging: out/raw\n  clean: out\n",
            "paths:\n  staging: raw\n  clean: ./raw\n",
            "paths:\n  staging: raw\n  clean: tmp/../raw/x\n",
        ] {
            let config = PipelineConfig::from_yaml(&format!("{base}{paths}")).unwrap();
            assert!(config.validate().is_err(), "accepted {paths:?}");
        }

        let config =
            PipelineConfig::from_yaml(&format!("{base}paths:\n  staging: raw\n  clean: raw_clean\n"))
                .unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_required_fields() {
        let config = PipelineConfig::from_yaml(BUILTIN_PIPELINE).unwrap();
        let err = config.bucket.require_name().unwrap_err();
        assert_eq!(err.to_string(), "Missing required config field: S3_BUCKET");
        assert!(config.warehouse.require_iam_role().is_err());
        assert!(config.transform.require_api_token().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_resources() {
        let yaml = r"
resources:
  - name: routes
    url: https://example.com/a.csv
  - name: routes
    url: https://example.com/b.csv
";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_table() {
        let yaml = r#"
resources:
  - name: routes
    url: https://example.com/routes.csv
load:
  - object: routes_cleaned.csv
    table: "routes; DROP TABLE x"
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let yaml = r"
resources:
  - name: routes
    url: not a url
";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = PipelineConfig::from_yaml(BUILTIN_PIPELINE).unwrap();
        config.apply_env(env(&[
            ("REDSHIFT_PASSWORD", "hunter2"),
            ("DBT_CLOUD_API_TOKEN", "dbtc_secret"),
            ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
        ]))
        .unwrap();
        let shown = config.redacted();
        assert_eq!(shown.warehouse.password.as_deref(), Some(REDACTED));
        assert_eq!(shown.transform.api_token.as_deref(), Some(REDACTED));
        assert_eq!(shown.bucket.access_key_id.as_deref(), Some("AKIAEXAMPLE"));
        assert_eq!(shown.bucket.secret_access_key, None);
    }
}

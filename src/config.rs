//! Configuration types for redshift-unload

use crate::credential::Credential;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Warehouse connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Cluster endpoint hostname
    #[serde(default = "default_host")]
    pub host: String,

    /// Cluster port (default: 5439)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database user
    #[serde(default)]
    pub user: String,

    /// Database password
    #[serde(default)]
    pub password: String,

    /// Database name (default: "dev")
    #[serde(default = "default_database")]
    pub database: String,

    /// Wrap probed column names in double quotes, matching `ADDQUOTES` data rows (default: true)
    #[serde(default = "default_true")]
    pub quote_columns: bool,

    /// Connection establishment timeout (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            database: default_database(),
            quote_columns: true,
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("database", &self.database)
            .field("quote_columns", &self.quote_columns)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Object storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket the warehouse unloads into
    #[serde(default)]
    pub bucket: String,

    /// Bucket region (default: "us-east-1")
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services (None = AWS)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Allow plain HTTP endpoints (default: false)
    #[serde(default)]
    pub allow_http: bool,

    /// Root under which each session gets its own prefix (default: "tmp/redshift-unloader")
    #[serde(default = "default_remote_root")]
    pub remote_root: String,

    /// Retry policy for list and download calls
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            allow_http: false,
            remote_root: default_remote_root(),
            retry: RetryConfig::default(),
        }
    }
}

/// Local side of the export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory under which per-session staging directories are created
    /// (default: the system temp directory)
    #[serde(default = "default_staging_root")]
    pub staging_root: PathBuf,

    /// Maximum partitions downloaded at once (default: 4)
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,

    /// Copy buffer used when appending partitions to the destination (default: 2 MiB)
    #[serde(default = "default_copy_buffer_size")]
    pub copy_buffer_size: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            staging_root: default_staging_root(),
            download_concurrency: default_download_concurrency(),
            copy_buffer_size: default_copy_buffer_size(),
        }
    }
}

impl ExportConfig {
    /// Validate the local export settings
    pub fn validate(&self) -> Result<()> {
        if self.download_concurrency == 0 {
            return Err(Error::config(
                "export.download_concurrency",
                "must be at least 1",
            ));
        }
        if self.copy_buffer_size == 0 {
            return Err(Error::config(
                "export.copy_buffer_size",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Retry configuration for transient object store failures
///
/// Only the object store collaborator retries; the export pipeline itself is fail-fast.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Policy that never retries
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }
}

/// Main configuration for [`crate::Unloader`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Warehouse connection
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Object storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Access-key credential used by both the unload and the object store
    #[serde(default)]
    pub credential: Credential,

    /// Local staging and merge settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::local_io(path, e))?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        if self.warehouse.host.trim().is_empty() {
            return Err(Error::config("warehouse.host", "must not be empty"));
        }
        if self.warehouse.database.trim().is_empty() {
            return Err(Error::config("warehouse.database", "must not be empty"));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(Error::config("storage.bucket", "must not be empty"));
        }
        if !self.credential.is_complete() {
            return Err(Error::config(
                "credential",
                "access_key_id and secret_access_key are required",
            ));
        }
        self.export.validate()
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5439
}

fn default_database() -> String {
    "dev".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_remote_root() -> String {
    "tmp/redshift-unloader".to_string()
}

fn default_staging_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_download_concurrency() -> usize {
    4
}

fn default_copy_buffer_size() -> usize {
    2 * 1024 * 1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

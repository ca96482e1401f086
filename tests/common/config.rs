//! Test configuration helpers for building unloaders and loading live credentials

use std::path::Path;
use std::sync::Arc;

use object_store::memory::InMemory;
use redshift_unload::{BucketStorage, Config, Credential, RetryConfig, Unloader};

use super::fixtures::{BUCKET, InMemoryWarehouse};

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Configuration staging under `staging_root`
pub fn test_config(staging_root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.bucket = BUCKET.to_string();
    config.storage.retry = RetryConfig::disabled();
    config.credential = Credential::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY");
    config.export.staging_root = staging_root.to_path_buf();
    config
}

/// Unloader over an in-memory bucket and `warehouse`
pub fn in_memory_unloader(
    staging_root: &Path,
    store: Arc<InMemory>,
    warehouse: Arc<InMemoryWarehouse>,
    delete_batch_size: usize,
) -> Unloader {
    let storage = BucketStorage::new(BUCKET, store)
        .with_retry(RetryConfig::disabled())
        .with_delete_batch_size(delete_batch_size);
    Unloader::with_clients(test_config(staging_root), warehouse, Arc::new(storage)).unwrap()
}

/// Load a live configuration from environment variables
///
/// Required environment variables:
/// - `REDSHIFT_HOST` - Cluster endpoint
/// - `REDSHIFT_USER` - Database user
/// - `REDSHIFT_PASSWORD` - Database password
/// - `UNLOAD_BUCKET` - Bucket the cluster may write to
/// - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` - Credential for the bucket
///
/// Optional environment variables:
/// - `REDSHIFT_PORT` - Cluster port (default: 5439)
/// - `REDSHIFT_DATABASE` - Database name (default: dev)
/// - `UNLOAD_REGION` - Bucket region (default: us-east-1)
pub fn load_live_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let var = |name: &str| {
        std::env::var(name).map_err(|_| ConfigError(format!("{} not set in environment", name)))
    };

    let mut config = Config::default();
    config.warehouse.host = var("REDSHIFT_HOST")?;
    config.warehouse.user = var("REDSHIFT_USER")?;
    config.warehouse.password = var("REDSHIFT_PASSWORD")?;
    if let Some(port) = std::env::var("REDSHIFT_PORT").ok().and_then(|p| p.parse().ok()) {
        config.warehouse.port = port;
    }
    if let Ok(database) = std::env::var("REDSHIFT_DATABASE") {
        config.warehouse.database = database;
    }
    config.storage.bucket = var("UNLOAD_BUCKET")?;
    if let Ok(region) = std::env::var("UNLOAD_REGION") {
        config.storage.region = region;
    }
    config.credential = Credential::new(var("AWS_ACCESS_KEY_ID")?, var("AWS_SECRET_ACCESS_KEY")?);

    Ok(config)
}

/// Whether live credentials are available
pub fn has_live_credentials() -> bool {
    load_live_config().is_ok()
}

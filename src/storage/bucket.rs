//! [`ObjectStorage`] over an `object_store` bucket

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::{RetryConfig, StorageConfig};
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::retry::with_retry;

use super::{MAX_DELETE_BATCH, ObjectStorage, delete_batches};

/// Object storage client bound to one bucket
pub struct BucketStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    retry: RetryConfig,
    pub(super) delete_batch_size: usize,
}

impl BucketStorage {
    /// Wrap an existing store that represents `bucket`
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            retry: RetryConfig::default(),
            delete_batch_size: MAX_DELETE_BATCH,
        }
    }

    /// Connect to the configured S3 bucket with `credential`
    pub fn s3(config: &StorageConfig, credential: &Credential) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_access_key_id(&credential.access_key_id)
            .with_secret_access_key(&credential.secret_access_key);

        if let Some(endpoint) = &config.endpoint {
            // Path-style requests for S3-compatible services such as MinIO
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| Error::config("storage", e.to_string()))?;

        Ok(Self::new(config.bucket.clone(), Arc::new(store)).with_retry(config.retry.clone()))
    }

    /// Use `retry` for list and download calls
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Use smaller delete batches (clamped to `1..=MAX_DELETE_BATCH`)
    pub fn with_delete_batch_size(mut self, size: usize) -> Self {
        self.delete_batch_size = size.clamp(1, MAX_DELETE_BATCH);
        self
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_once(&self, prefix: &ObjectPath, raw_prefix: &str) -> Result<Vec<String>> {
        let mut listing = self.store.list(Some(prefix));
        let mut keys = Vec::new();
        while let Some(meta) = listing.next().await {
            let meta = meta.map_err(|e| map_store_error(raw_prefix, e))?;
            keys.push(meta.location.to_string());
        }
        keys.sort();
        Ok(keys)
    }

    async fn download_once(
        &self,
        key: &str,
        location: &ObjectPath,
        local_path: &Path,
    ) -> Result<u64> {
        let object = self
            .store
            .get(location)
            .await
            .map_err(|e| map_store_error(key, e))?;

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| Error::local_io(local_path, e))?;
        let mut chunks = object.into_stream();
        let mut written = 0u64;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| map_store_error(key, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::local_io(local_path, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| Error::local_io(local_path, e))?;

        Ok(written)
    }
}

#[async_trait]
impl ObjectStorage for BucketStorage {
    fn uri(&self, path: &str) -> String {
        format!("s3://{}/{}", self.bucket, path.trim_start_matches('/'))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let location = parse_key(prefix)?;
        with_retry(&self.retry, || self.list_once(&location, prefix)).await
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<u64> {
        debug!(key, ?local_path, "downloading object");
        let location = parse_key(key)?;
        with_retry(&self.retry, || self.download_once(key, &location, local_path)).await
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        debug!(count = keys.len(), bucket = %self.bucket, "removing objects");

        for (batch, chunk) in delete_batches(keys, self.delete_batch_size).enumerate() {
            let locations = chunk
                .iter()
                .map(|key| parse_key(key))
                .collect::<Result<Vec<_>>>()?;

            let requests = stream::iter(locations.into_iter().map(Ok::<_, object_store::Error>));
            let mut results = self.store.delete_stream(requests.boxed());

            let mut deleted = HashSet::with_capacity(chunk.len());
            let mut first_error = None;
            while let Some(result) = results.next().await {
                match result {
                    Ok(location) => {
                        deleted.insert(location.to_string());
                    }
                    Err(e) => {
                        first_error.get_or_insert_with(|| e.to_string());
                    }
                }
            }

            if let Some(message) = first_error {
                let failed_keys: Vec<String> = chunk
                    .iter()
                    .filter(|key| !deleted.contains(key.as_str()))
                    .cloned()
                    .collect();
                tracing::error!(
                    batch,
                    failed = failed_keys.len(),
                    error = %message,
                    "batch delete failed"
                );
                return Err(Error::Delete {
                    failed_keys,
                    batch,
                    message,
                });
            }

            debug!(batch, count = chunk.len(), "deleted batch");
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "object_store"
    }
}

fn parse_key(key: &str) -> Result<ObjectPath> {
    ObjectPath::parse(key).map_err(|e| Error::InvalidObjectKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn map_store_error(key: &str, error: object_store::Error) -> Error {
    if let object_store::Error::NotFound { .. } = error {
        return Error::NotFound {
            key: key.to_string(),
        };
    }

    let message = error.to_string();
    if message.contains("AccessDenied") || message.contains("Forbidden") {
        Error::Permission { message }
    } else {
        Error::Transfer {
            key: key.to_string(),
            message,
        }
    }
}

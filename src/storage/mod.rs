//! Object storage client
//!
//! The export pipeline talks to object storage only through the [`ObjectStorage`]
//! trait: list keys under a prefix, download one key to a local file, and delete
//! a set of keys in bounded batches.
//!
//! [`BucketStorage`] implements it over any [`object_store::ObjectStore`]:
//! Amazon S3 in production ([`BucketStorage::s3`]) and
//! [`object_store::memory::InMemory`] in tests.

mod bucket;


use async_trait::async_trait;
use std::path::Path;

pub use bucket::BucketStorage;

/// Maximum keys per delete request, the ceiling of the S3 `DeleteObjects` API
pub const MAX_DELETE_BATCH: usize = 1000;

/// Object store operations consumed by the export pipeline
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// URI of `path` in this store, e.g. `s3://bucket/path`
    ///
    /// A leading `/` in `path` is ignored.
    fn uri(&self, path: &str) -> String;

    /// Keys under `prefix`, lexicographically ordered
    ///
    /// # Errors
    ///
    /// `Transfer` if the listing fails, `Permission` if access is denied.
    async fn list(&self, prefix: &str) -> crate::Result<Vec<String>>;

    /// Download `key` to `local_path`, overwriting it; returns bytes written
    ///
    /// # Errors
    ///
    /// `NotFound` if the key does not exist, `Transfer` for other fetch failures,
    /// `LocalIo` if the local file cannot be written.
    async fn download(&self, key: &str, local_path: &Path) -> crate::Result<u64>;

    /// Delete `keys` in sequential batches of at most [`MAX_DELETE_BATCH`]
    ///
    /// Not atomic across batches: on failure earlier batches stay deleted.
    ///
    /// # Errors
    ///
    /// `Delete` naming the failing batch and its keys not confirmed deleted.
    async fn delete(&self, keys: &[String]) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Split `keys` into consecutive batches of at most `batch_size` keys
///
/// Batch `i` holds `keys[batch_size * i .. min(batch_size * (i + 1), keys.len())]`.
pub fn delete_batches(keys: &[String], batch_size: usize) -> std::slice::Chunks<'_, String> {
    keys.chunks(batch_size.max(1))
}

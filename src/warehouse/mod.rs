//! Warehouse client
//!
//! The export pipeline needs two things from the warehouse: the column names a
//! query produces, and a way to run the `UNLOAD` statement. Both go through the
//! [`Warehouse`] trait so the pipeline can run against [`RedshiftClient`] in
//! production and against in-process fakes in tests.
//!
//! Warehouse calls are never retried: a failed `UNLOAD` may already have written
//! partitions, and re-running it is the caller's decision.

mod redshift;

pub use redshift::RedshiftClient;

use async_trait::async_trait;

/// Warehouse operations consumed by the export pipeline
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Ordered column names produced by `query`, without fetching rows
    ///
    /// # Errors
    ///
    /// `Query` if the warehouse rejects the query, `Permission` if the user
    /// lacks privileges on a referenced relation.
    async fn probe_columns(&self, query: &str) -> crate::Result<Vec<String>>;

    /// Run `statement` and wait for it to finish
    ///
    /// # Errors
    ///
    /// `Query` on rejection or a lost connection, `Permission` when the
    /// warehouse or the bucket denies access.
    async fn execute(&self, statement: &str) -> crate::Result<()>;

    /// Release the connection. Later calls fail with `Query`
    async fn close(&self) -> crate::Result<()> {
        Ok(())
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

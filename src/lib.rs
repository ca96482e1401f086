//! # redshift-unload
//!
//! Export the result of a Redshift query into a single local gzip file.
//!
//! The warehouse writes the result set to S3 in parallel with `UNLOAD`; the
//! partitions are then downloaded, concatenated (optionally behind a header
//! line) into one multi-member gzip file, and removed from both the bucket and
//! the local staging directory.
//!
//! ## Design Philosophy
//!
//! - **Fail-fast** - The first failing step aborts the export; nothing is rolled
//!   back, and the error says exactly what may have been left behind
//! - **Isolated sessions** - Every export gets its own remote prefix and staging
//!   directory, so exports can run concurrently on one [`Unloader`]
//! - **Pluggable clients** - The pipeline talks to the warehouse and the bucket
//!   through the [`Warehouse`] and [`ObjectStorage`] traits
//! - **Event-driven** - Consumers subscribe to progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use redshift_unload::{Config, Credential, Unloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.warehouse.host = "examplecluster.abc123.us-west-2.redshift.amazonaws.com".into();
//!     config.warehouse.user = "awsuser".into();
//!     config.warehouse.password = "secret".into();
//!     config.storage.bucket = "my-unload-bucket".into();
//!     config.credential = Credential::new("AKIA...", "...");
//!
//!     let unloader = Unloader::connect(config).await?;
//!
//!     let mut events = unloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = unloader
//!         .export("SELECT * FROM sales", "sales.csv.gz", true)
//!         .await?;
//!     println!("wrote {} bytes", summary.bytes_written);
//!
//!     unloader.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Access-key credential
pub mod credential;
/// Error types
pub mod error;
/// Header encoding and partition merge
pub mod merge;
/// Retry logic with exponential backoff
pub mod retry;
/// Export sessions and partition planning
pub mod session;
/// UNLOAD and probe statement builders
pub mod statement;
/// Object storage client
pub mod storage;
/// Core types and events
pub mod types;
/// Export orchestration
pub mod unloader;
/// Warehouse client
pub mod warehouse;

// Re-export commonly used types
pub use config::{Config, ExportConfig, RetryConfig, StorageConfig, WarehouseConfig};
pub use credential::Credential;
pub use error::{Error, ExportFailure, Result};
pub use statement::{UnloadOptions, column_probe_statement, escape_query, unload_statement};
pub use storage::{BucketStorage, MAX_DELETE_BATCH, ObjectStorage};
pub use types::{Event, ExportSummary, SessionId, Stage};
pub use unloader::Unloader;
pub use warehouse::{RedshiftClient, Warehouse};

/// Wait for a termination signal, then shut the unloader down
///
/// Running exports stop at their next step boundary and fail with
/// `Error::Cancelled`.
///
/// - **Unix:** listens for SIGTERM and SIGINT, falling back to Ctrl+C if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use redshift_unload::{Config, Unloader, shutdown_on_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let unloader = Unloader::connect(Config::from_json_file("unload.json")?).await?;
///
///     tokio::spawn(shutdown_on_signal(unloader.clone()));
///     unloader.export("SELECT 1", "one.gz", true).await?;
///
///     Ok(())
/// }
/// ```
pub async fn shutdown_on_signal(unloader: Unloader) {
    wait_for_signal().await;
    unloader.shutdown();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (sigterm, sigint) => {
            if let Err(e) = sigterm.as_ref().and(sigint.as_ref()) {
                tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            }
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

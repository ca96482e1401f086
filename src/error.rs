//! Error types for redshift-unload
//!
//! This module provides the error taxonomy for the export pipeline:
//! - Collaborator failures (warehouse query/permission, object transfer, batch delete)
//! - Local filesystem failures with the offending path
//! - Export failures wrapped with the pipeline stage and session context needed
//!   to locate orphaned remote objects and staging directories

use crate::types::{SessionId, Stage};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for redshift-unload operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for redshift-unload
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "storage.bucket")
        key: Option<String>,
    },

    /// The warehouse rejected a statement or the connection is unavailable
    #[error("query error: {message}")]
    Query {
        /// Message reported by the warehouse or the driver
        message: String,
    },

    /// The credential lacks a required privilege (reported by the warehouse or the store)
    #[error("permission denied: {message}")]
    Permission {
        /// Message reported by the collaborator
        message: String,
    },

    /// Remote object does not exist
    #[error("object not found: {key}")]
    NotFound {
        /// Object key that could not be found
        key: String,
    },

    /// Object transfer (list or download) failed
    #[error("transfer of {key} failed: {message}")]
    Transfer {
        /// Object key (or listing prefix) being transferred
        key: String,
        /// Underlying failure
        message: String,
    },

    /// Batch deletion failed, fully or partially
    #[error("delete batch {batch} failed for {} object(s): {message}", failed_keys.len())]
    Delete {
        /// Keys of the failing batch that were not confirmed deleted
        failed_keys: Vec<String>,
        /// Zero-based index of the failing batch
        batch: usize,
        /// Underlying failure
        message: String,
    },

    /// Local filesystem failure with the path involved
    #[error("I/O error at {path}: {source}")]
    LocalIo {
        /// Path being created, opened, read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error without path context
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object key cannot be staged locally
    #[error("invalid object key {key}: {reason}")]
    InvalidObjectKey {
        /// The offending key
        key: String,
        /// Why the key cannot be mapped to a staging file
        reason: String,
    },

    /// The unloader was shut down while the export was in progress
    #[error("export cancelled")]
    Cancelled,

    /// An export step failed; carries the pipeline context of the failure
    #[error("{0}")]
    Export(Box<ExportFailure>),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::LocalIo`] for `path`
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Build a [`Error::Config`] for `key`
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Query { .. } => "query_error",
            Error::Permission { .. } => "permission_error",
            Error::NotFound { .. } => "not_found",
            Error::Transfer { .. } => "transfer_error",
            Error::Delete { .. } => "delete_error",
            Error::LocalIo { .. } | Error::Io(_) => "local_io_error",
            Error::InvalidObjectKey { .. } => "invalid_object_key",
            Error::Cancelled => "cancelled",
            Error::Export(failure) => failure.source.error_code(),
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// The export failure context, if this error came out of [`crate::Unloader::export`]
    pub fn export_failure(&self) -> Option<&ExportFailure> {
        match self {
            Error::Export(failure) => Some(failure.as_ref()),
            _ => None,
        }
    }
}

/// Context of a failed export
///
/// The pipeline is fail-fast and performs no rollback, so this records everything
/// that may have been left behind: remote objects under `remote_prefix` once the
/// unload was requested, and `staging_dir` once it was created.
#[derive(Debug, Error)]
#[error("export {session_id} failed during {failed_step} (last completed: {reached}): {source}")]
pub struct ExportFailure {
    /// Session of the failed export
    pub session_id: SessionId,
    /// Last stage that completed successfully
    pub reached: Stage,
    /// Stage whose work failed
    pub failed_step: Stage,
    /// Remote prefix the unload writes under
    pub remote_prefix: String,
    /// Remote keys known at the time of failure (empty before listing)
    pub remote_keys: Vec<String>,
    /// Staging directory, if it was created
    pub staging_dir: Option<PathBuf>,
    /// Error raised by the failing step
    #[source]
    pub source: Box<Error>,
}

impl ExportFailure {
    /// Whether objects may remain under [`ExportFailure::remote_prefix`]
    ///
    /// The warehouse may write partitions as soon as the unload is requested,
    /// so anything from that step up to (and including) remote deletion leaks.
    pub fn remote_objects_may_remain(&self) -> bool {
        self.failed_step >= Stage::Unloaded && self.reached < Stage::RemoteCleaned
    }

    /// Whether the local staging directory was left on disk
    pub fn staging_dir_remains(&self) -> bool {
        self.staging_dir.is_some() && self.reached < Stage::LocalCleaned
    }
}

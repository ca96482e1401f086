//! Core types and events for redshift-unload

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for one export session
///
/// Scopes the remote prefix and the local staging directory of a single export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a fresh random (v4) session id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Export pipeline stage
///
/// Stages are strictly linear; each value names the step that has just completed.
/// Ordering follows pipeline order, so `stage >= Stage::Unloaded` means the
/// unload has been executed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing done yet
    #[default]
    Init,
    /// Session id, remote prefix and staging path derived
    SessionCreated,
    /// Header columns probed (skipped when no header is requested)
    ColumnsResolved,
    /// Warehouse unload executed
    Unloaded,
    /// Remote partitions listed
    Listed,
    /// Local staging directory created
    StagingReady,
    /// All partitions downloaded
    Downloaded,
    /// Destination file written
    Merged,
    /// Remote partitions deleted
    RemoteCleaned,
    /// Staging directory removed
    LocalCleaned,
    /// Export finished
    Done,
}

impl Stage {
    /// Stable snake_case name, used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::SessionCreated => "session_created",
            Stage::ColumnsResolved => "columns_resolved",
            Stage::Unloaded => "unloaded",
            Stage::Listed => "listed",
            Stage::StagingReady => "staging_ready",
            Stage::Downloaded => "downloaded",
            Stage::Merged => "merged",
            Stage::RemoteCleaned => "remote_cleaned",
            Stage::LocalCleaned => "local_cleaned",
            Stage::Done => "done",
        }
    }

    /// Stage that follows this one; `Done` is terminal
    pub fn next(self) -> Stage {
        match self {
            Stage::Init => Stage::SessionCreated,
            Stage::SessionCreated => Stage::ColumnsResolved,
            Stage::ColumnsResolved => Stage::Unloaded,
            Stage::Unloaded => Stage::Listed,
            Stage::Listed => Stage::StagingReady,
            Stage::StagingReady => Stage::Downloaded,
            Stage::Downloaded => Stage::Merged,
            Stage::Merged => Stage::RemoteCleaned,
            Stage::RemoteCleaned => Stage::LocalCleaned,
            Stage::LocalCleaned | Stage::Done => Stage::Done,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Session that produced the file
    pub session_id: SessionId,
    /// Destination file
    pub destination: PathBuf,
    /// Header columns, when a header was requested
    pub columns: Option<Vec<String>>,
    /// Number of partitions merged
    pub partitions: usize,
    /// Bytes written to the destination (compressed)
    pub bytes_written: u64,
    /// Wall-clock duration of the export
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

/// Event emitted by the unloader
///
/// Subscribe with [`crate::Unloader::subscribe`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A pipeline stage completed
    StageReached {
        /// Export session
        session_id: SessionId,
        /// Stage that completed
        stage: Stage,
    },

    /// One partition finished downloading
    PartitionDownloaded {
        /// Export session
        session_id: SessionId,
        /// Object key
        key: String,
        /// Bytes downloaded
        bytes: u64,
        /// Partitions downloaded so far
        completed: usize,
        /// Total partitions
        total: usize,
    },

    /// Export finished successfully
    Completed {
        /// Export session
        session_id: SessionId,
        /// Destination file
        destination: PathBuf,
        /// Bytes written
        bytes_written: u64,
    },

    /// Export failed
    Failed {
        /// Export session
        session_id: SessionId,
        /// Stage whose work failed
        stage: Stage,
        /// Error message
        error: String,
        /// Whether remote objects may be orphaned under the session prefix
        remote_objects_may_remain: bool,
    },
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

//! Export sessions: unique remote prefix and local staging directory per export

use crate::error::{Error, Result};
use crate::types::SessionId;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Scope of one export invocation
///
/// Never reused: every export creates a new session with a fresh id.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session id
    pub id: SessionId,
    /// Remote prefix the warehouse unloads under, always ending in `/`
    pub remote_prefix: String,
    /// Local directory holding downloaded partitions until merge completes
    pub staging_dir: PathBuf,
}

impl Session {
    /// Start a session under `remote_root` (remote) and `staging_root` (local)
    pub fn new(remote_root: &str, staging_root: &Path) -> Self {
        Self::with_id(SessionId::new(), remote_root, staging_root)
    }

    /// Build a session for a known id
    pub fn with_id(id: SessionId, remote_root: &str, staging_root: &Path) -> Self {
        let id_str = id.to_string();
        Self {
            id,
            remote_prefix: remote_prefix(remote_root, &id_str),
            staging_dir: staging_root.join(&id_str),
        }
    }

    /// Create the staging directory, readable only by the owner
    ///
    /// Fails if the directory already exists, so two exports can never share one.
    pub async fn create_staging_dir(&self) -> Result<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(false);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&self.staging_dir)
            .await
            .map_err(|e| Error::local_io(&self.staging_dir, e))
    }

    /// Map listed `keys` to staged files named after each key's base name
    ///
    /// Partition order follows `keys`.
    ///
    /// # Errors
    ///
    /// `InvalidObjectKey` for a key with an empty base name, or for a key whose
    /// base name was already taken by an earlier key.
    pub fn plan_partitions(&self, keys: &[String]) -> Result<Vec<Partition>> {
        let mut seen = HashSet::with_capacity(keys.len());
        keys.iter()
            .enumerate()
            .map(|(index, key)| {
                let name = base_name(key);
                if name.is_empty() || name == "." || name == ".." {
                    return Err(Error::InvalidObjectKey {
                        key: key.clone(),
                        reason: "key has no file name".to_string(),
                    });
                }
                if !seen.insert(name) {
                    return Err(Error::InvalidObjectKey {
                        key: key.clone(),
                        reason: format!("file name {:?} is used by another key", name),
                    });
                }
                Ok(Partition {
                    index,
                    key: key.clone(),
                    local_path: self.staging_dir.join(name),
                })
            })
            .collect()
    }

    /// Recursively remove the staging directory
    pub async fn remove_staging_dir(&self) -> Result<()> {
        tokio::fs::remove_dir_all(&self.staging_dir)
            .await
            .map_err(|e| Error::local_io(&self.staging_dir, e))
    }
}

/// One remote object and the staged file it downloads to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Position in the listing, and in the merged output
    pub index: usize,
    /// Remote object key
    pub key: String,
    /// Staged file path
    pub local_path: PathBuf,
}

fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// `<root>/<id>/` with surrounding slashes of `root` dropped; `<id>/` for an empty root
fn remote_prefix(root: &str, id: &str) -> String {
    let root = root.trim_matches('/');
    if root.is_empty() {
        format!("{}/", id)
    } else {
        format!("{}/{}/", root, id)
    }
}

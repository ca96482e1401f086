//! Access-key credential shared by the unload statement and the object store

use serde::{Deserialize, Serialize};

const REDACTED: &str = "********";

/// Access-key credential
///
/// Embedded in the `UNLOAD` statement so the warehouse can write to the bucket,
/// and used by the object store client to read and delete the partitions.
/// The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Credential {
    /// Access key identifier
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
}

impl Credential {
    /// Create a credential
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Keyword/value pairs in the order they appear in an `UNLOAD` statement
    pub fn clauses(&self) -> [(&'static str, &str); 2] {
        [
            ("ACCESS_KEY_ID", self.access_key_id.as_str()),
            ("SECRET_ACCESS_KEY", self.secret_access_key.as_str()),
        ]
    }

    /// Copy with the secret masked, for rendering statements into logs
    pub fn redacted(&self) -> Self {
        Self {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: REDACTED.to_string(),
        }
    }

    /// Whether both parts are present
    pub fn is_complete(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .finish()
    }
}

//! Blob references handed out by a blob client.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved reference to one blob.
///
/// Obtained from [`BlobClient::resolve_blob_reference`](crate::BlobClient::resolve_blob_reference)
/// and passed back to the client for lease operations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobReference {
    /// Container holding the blob
    pub container: String,
    /// Blob name inside the container
    pub blob: String,
}

impl BlobReference {
    /// Creates a reference to `container/blob`.
    pub fn new(container: impl Into<String>, blob: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            blob: blob.into(),
        }
    }
}

impl fmt::Display for BlobReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.blob)
    }
}

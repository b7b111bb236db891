//! Open-file records stored in the handle registry.

use serde::{Deserialize, Serialize};

use crate::types::BlobReference;

/// The payload kept for every open handle.
///
/// Created by the filesystem layer when a file is opened (after any lease has
/// been acquired) and handed to the registry. The registry never mutates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenFileRecord {
    /// Process-unique handle id, assigned by the caller
    pub handle_key: u64,
    /// Container of the blob backing this handle
    pub container: String,
    /// Name of the blob backing this handle
    pub blob_name: String,
    /// Lease held on the blob, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<String>,
}

impl OpenFileRecord {
    /// Creates a record for a handle that holds no lease.
    pub fn new(handle_key: u64, container: impl Into<String>, blob_name: impl Into<String>) -> Self {
        Self {
            handle_key,
            container: container.into(),
            blob_name: blob_name.into(),
            lease_id: None,
        }
    }

    /// Attaches a lease id to the record.
    pub fn with_lease(mut self, lease_id: impl Into<String>) -> Self {
        self.lease_id = Some(lease_id.into());
        self
    }

    /// Returns the lease id when it is present and non-empty.
    pub fn active_lease(&self) -> Option<&str> {
        self.lease_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Returns true if the renewal daemon should keep this record's lease alive.
    pub fn has_lease(&self) -> bool {
        self.active_lease().is_some()
    }

    /// Returns a reference to the backing blob.
    pub fn blob_reference(&self) -> BlobReference {
        BlobReference::new(&self.container, &self.blob_name)
    }
}

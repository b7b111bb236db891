//! Error types for BlobFS.
//!
//! One error hierarchy, built with `thiserror`, shared by the cache, the
//! handle registry, and blob clients.

use thiserror::Error;

/// Result type alias using `BlobFsError`.
pub type Result<T> = std::result::Result<T, BlobFsError>;

/// Main error type for all BlobFS open-file operations.
#[derive(Debug, Error)]
pub enum BlobFsError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CACHE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The cache is full and the key being inserted is new.
    #[error("Cache capacity exceeded: {capacity} entries already stored")]
    CapacityExceeded { capacity: usize },

    // ═══════════════════════════════════════════════════════════════════════════
    // LEASE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The lease lapsed before it was renewed.
    #[error("Lease '{lease_id}' on {container}/{blob} has expired")]
    LeaseExpired {
        container: String,
        blob: String,
        lease_id: String,
    },

    /// The blob is leased, but not under the supplied lease id.
    #[error("Lease id mismatch on {container}/{blob}")]
    LeaseMismatch { container: String, blob: String },

    /// The blob is already leased by someone else.
    #[error("Blob {container}/{blob} is already leased")]
    LeaseAlreadyPresent { container: String, blob: String },

    /// The blob carries no lease at all.
    #[error("Blob {container}/{blob} has no lease")]
    LeaseNotPresent { container: String, blob: String },

    /// Requested lease duration is outside what the service accepts.
    #[error("Invalid lease duration: {seconds}s")]
    InvalidLeaseDuration { seconds: u64 },

    // ═══════════════════════════════════════════════════════════════════════════
    // BLOB ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The container does not exist.
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// The blob does not exist (or was deleted while open).
    #[error("Blob not found: {container}/{blob}")]
    BlobNotFound { container: String, blob: String },

    /// Transport-level failure talking to the storage service.
    #[error("Storage request failed: {0}")]
    RequestFailed(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// OS-level I/O error (e.g. spawning the renewal thread).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl BlobFsError {
    /// Returns true if retrying the same call later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BlobFsError::CapacityExceeded { .. } | BlobFsError::RequestFailed(_)
        )
    }

    /// Returns true if the handle's lease is gone or was never ours.
    ///
    /// The filesystem layer treats these as "reopen required".
    pub fn is_lease_error(&self) -> bool {
        matches!(
            self,
            BlobFsError::LeaseExpired { .. }
                | BlobFsError::LeaseMismatch { .. }
                | BlobFsError::LeaseAlreadyPresent { .. }
                | BlobFsError::LeaseNotPresent { .. }
        )
    }

    /// Returns true if the target container or blob no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BlobFsError::ContainerNotFound(_) | BlobFsError::BlobNotFound { .. }
        )
    }
}

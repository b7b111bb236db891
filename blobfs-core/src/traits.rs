//! Common traits for BlobFS.
//!
//! The renewal daemon only sees blob storage through these interfaces, so a
//! remote client and the in-memory store are interchangeable.

use crate::error::Result;
use crate::types::BlobReference;

// ═══════════════════════════════════════════════════════════════════════════════
// BLOB CLIENT TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the blob storage service.
///
/// Calls are blocking from the caller's point of view. Request timeouts are
/// the implementation's concern.
pub trait BlobClient: Send + Sync {
    /// Resolves `container/blob` to a reference usable for lease calls.
    fn resolve_blob_reference(&self, container: &str, blob: &str) -> Result<BlobReference>;

    /// Renews the lease `lease_id` held on `blob`.
    ///
    /// Renewing a still-valid lease must be safe to repeat. A lapsed lease
    /// yields [`BlobFsError::LeaseExpired`](crate::BlobFsError::LeaseExpired),
    /// a missing blob [`BlobFsError::BlobNotFound`](crate::BlobFsError::BlobNotFound).
    fn renew_lease(&self, blob: &BlobReference, lease_id: &str) -> Result<()>;
}

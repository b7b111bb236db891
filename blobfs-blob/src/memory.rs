//! In-memory blob store.
//!
//! Thread-safe container/blob bookkeeping with leases that lapse by wall
//! clock, so renewal behavior can be observed without a storage account.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use blobfs_core::error::{BlobFsError, Result};
use blobfs_core::traits::BlobClient;
use blobfs_core::types::BlobReference;

/// A lease currently recorded on a blob.
#[derive(Clone, Debug)]
struct Lease {
    id: String,
    duration: Duration,
    expires_at: Instant,
}

impl Lease {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Clone, Debug, Default)]
struct BlobState {
    lease: Option<Lease>,
}

/// Observable lease state of a blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaseState {
    /// No lease recorded
    Available,
    /// Leased and within its duration
    Leased,
    /// A lease was recorded but lapsed without renewal
    Expired,
}

/// Counters for lease renewal traffic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobStoreStats {
    /// Renewal calls received
    pub renew_attempts: u64,
    /// Renewal calls that extended a lease
    pub renewals: u64,
    /// Leases handed out
    pub leases_acquired: u64,
}

/// In-memory blob store.
///
/// Blobs carry no data here; only existence and lease state are tracked,
/// which is all the open-file registry interacts with.
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    containers: DashSet<String>,
    blobs: DashMap<BlobReference, BlobState>,
    renew_attempts: AtomicU64,
    renewals: AtomicU64,
    leases_acquired: AtomicU64,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container. Returns false if it already existed.
    pub fn create_container(&self, name: &str) -> bool {
        self.containers.insert(name.to_string())
    }

    /// Creates (or overwrites) an empty blob and returns its reference.
    pub fn put_blob(&self, container: &str, blob: &str) -> Result<BlobReference> {
        if !self.containers.contains(container) {
            return Err(BlobFsError::ContainerNotFound(container.to_string()));
        }
        let reference = BlobReference::new(container, blob);
        self.blobs.insert(reference.clone(), BlobState::default());
        Ok(reference)
    }

    /// Deletes a blob together with any lease on it.
    pub fn delete_blob(&self, blob: &BlobReference) -> Result<()> {
        self.blobs
            .remove(blob)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(blob))
    }

    /// Acquires a lease for `duration`, returning the new lease id.
    ///
    /// Fails with [`BlobFsError::LeaseAlreadyPresent`] while another lease is
    /// still valid. A lapsed lease can be taken over.
    #[instrument(skip(self, blob), fields(blob = %blob))]
    pub fn acquire_lease(&self, blob: &BlobReference, duration: Duration) -> Result<String> {
        if duration.is_zero() {
            return Err(BlobFsError::InvalidLeaseDuration { seconds: 0 });
        }

        let mut state = self.blobs.get_mut(blob).ok_or_else(|| Self::not_found(blob))?;
        if state.lease.as_ref().is_some_and(|lease| !lease.is_expired()) {
            return Err(BlobFsError::LeaseAlreadyPresent {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
            });
        }

        let id = Uuid::new_v4().to_string();
        state.lease = Some(Lease {
            id: id.clone(),
            duration,
            expires_at: Instant::now() + duration,
        });
        self.leases_acquired.fetch_add(1, Ordering::Relaxed);

        debug!(lease_id = %id, "Lease acquired");
        Ok(id)
    }

    /// Releases a lease held under `lease_id`.
    #[instrument(skip(self, blob), fields(blob = %blob))]
    pub fn release_lease(&self, blob: &BlobReference, lease_id: &str) -> Result<()> {
        let mut state = self.blobs.get_mut(blob).ok_or_else(|| Self::not_found(blob))?;
        let held_by_caller = state.lease.as_ref().map(|lease| lease.id == lease_id);
        match held_by_caller {
            None => Err(BlobFsError::LeaseNotPresent {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
            }),
            Some(false) => Err(BlobFsError::LeaseMismatch {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
            }),
            Some(true) => {
                state.lease = None;
                debug!("Lease released");
                Ok(())
            }
        }
    }

    /// Drops whatever lease is on the blob, regardless of holder.
    pub fn break_lease(&self, blob: &BlobReference) -> Result<()> {
        let mut state = self.blobs.get_mut(blob).ok_or_else(|| Self::not_found(blob))?;
        state.lease = None;
        Ok(())
    }

    /// Returns the current lease state of a blob.
    pub fn lease_state(&self, blob: &BlobReference) -> Result<LeaseState> {
        let state = self.blobs.get(blob).ok_or_else(|| Self::not_found(blob))?;
        Ok(match &state.lease {
            None => LeaseState::Available,
            Some(lease) if lease.is_expired() => LeaseState::Expired,
            Some(_) => LeaseState::Leased,
        })
    }

    /// Returns renewal counters.
    pub fn stats(&self) -> BlobStoreStats {
        BlobStoreStats {
            renew_attempts: self.renew_attempts.load(Ordering::Relaxed),
            renewals: self.renewals.load(Ordering::Relaxed),
            leases_acquired: self.leases_acquired.load(Ordering::Relaxed),
        }
    }

    fn not_found(blob: &BlobReference) -> BlobFsError {
        BlobFsError::BlobNotFound {
            container: blob.container.clone(),
            blob: blob.blob.clone(),
        }
    }
}

impl BlobClient for MemoryBlobStore {
    fn resolve_blob_reference(&self, container: &str, blob: &str) -> Result<BlobReference> {
        if !self.containers.contains(container) {
            return Err(BlobFsError::ContainerNotFound(container.to_string()));
        }
        let reference = BlobReference::new(container, blob);
        if !self.blobs.contains_key(&reference) {
            return Err(Self::not_found(&reference));
        }
        Ok(reference)
    }

    #[instrument(skip(self, blob, lease_id), fields(blob = %blob))]
    fn renew_lease(&self, blob: &BlobReference, lease_id: &str) -> Result<()> {
        self.renew_attempts.fetch_add(1, Ordering::Relaxed);

        let mut state = self.blobs.get_mut(blob).ok_or_else(|| Self::not_found(blob))?;
        let lease = state.lease.as_mut().ok_or_else(|| BlobFsError::LeaseNotPresent {
            container: blob.container.clone(),
            blob: blob.blob.clone(),
        })?;

        if lease.id != lease_id {
            return Err(BlobFsError::LeaseMismatch {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
            });
        }
        if lease.is_expired() {
            return Err(BlobFsError::LeaseExpired {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
                lease_id: lease_id.to_string(),
            });
        }

        lease.expires_at = Instant::now() + lease.duration;
        self.renewals.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

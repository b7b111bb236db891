//! # BlobFS Handles
//!
//! Registry of open file handles for the blob-backed filesystem.
//!
//! Every handle is kept in a bounded, expiring cache. Handles that hold a
//! lease on their blob have it renewed by a background daemon for as long as
//! they stay registered, so the filesystem layer never schedules renewals.
//!
//! ## Example
//!
//! ```rust,ignore
//! use blobfs_handles::{OpenFileRegistry, RegistryConfig};
//!
//! let registry = OpenFileRegistry::new(RegistryConfig::default(), client)?;
//!
//! // Opened with a lease: renewed in the background from now on
//! registry.put(fh, OpenFileRecord::new(fh, "docs", "a.txt").with_lease(lease_id))?;
//!
//! // Closed: renewal stops with the next cycle
//! registry.delete(fh);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod registry;
mod renewer;

pub use config::RegistryConfig;
pub use registry::{shutdown_global, OpenFileRegistry};
pub use renewer::{CycleReport, HandleStore, LeaseRenewer, RenewalDaemon, RenewerStats};

pub use blobfs_cache::CacheStats;

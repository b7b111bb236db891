//! # BlobFS Blob
//!
//! Blob storage backends for the BlobFS open-file lease keeper.
//!
//! - **Memory**: an in-process container/blob store with lease acquire,
//!   renew, release, and break semantics, suitable for tests and local runs
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use blobfs_blob::MemoryBlobStore;
//! use blobfs_core::BlobClient;
//!
//! let store = MemoryBlobStore::new();
//! store.create_container("docs");
//! let blob = store.put_blob("docs", "a.txt").unwrap();
//! let lease = store.acquire_lease(&blob, Duration::from_secs(60)).unwrap();
//! store.renew_lease(&blob, &lease).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;

pub use memory::{BlobStoreStats, LeaseState, MemoryBlobStore};

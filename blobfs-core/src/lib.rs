//! # BlobFS Core
//!
//! Core types, errors, and traits shared by the BlobFS open-file crates.
//!
//! - **Types**: open-file records and blob references
//! - **Errors**: one error enum for cache, lease, and blob failures
//! - **Constants**: registry sizing and lease timing defaults
//! - **Traits**: the blob client boundary the renewal daemon talks to
//!
//! ## Example
//!
//! ```rust
//! use blobfs_core::OpenFileRecord;
//!
//! let record = OpenFileRecord::new(7, "photos", "2024/cat.jpg").with_lease("lease-1");
//! assert!(record.has_lease());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{BlobFsError, Result};
pub use traits::*;
pub use types::*;

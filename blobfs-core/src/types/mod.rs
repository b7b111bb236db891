//! Domain types for BlobFS open-file tracking.
//!
//! - [`OpenFileRecord`]: what the registry stores per open handle
//! - [`BlobReference`]: a resolved pointer to a blob in a container

mod blob;
mod record;

pub use blob::*;
pub use record::*;

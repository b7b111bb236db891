//! Bounded TTL cache for BlobFS.
//!
//! Generic in-memory cache with a hard entry limit and fixed expiration.

mod cache;

pub use cache::{CacheConfig, CacheStats, ExpiringCache};

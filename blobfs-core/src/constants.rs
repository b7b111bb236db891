//! Process-wide defaults for the open-file registry and lease renewal.
//!
//! The registry reads these at construction time. Environment overrides are
//! applied on top of them by the registry configuration layer.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// OPEN FILE REGISTRY SIZING
// ═══════════════════════════════════════════════════════════════════════════════

/// Initial capacity hint for the open-file map.
pub const OPEN_FILES_INIT_CAPACITY: usize = 1024;

/// Maximum number of handles the registry will hold at once.
pub const OPEN_FILES_MAX_CAPACITY: usize = 10_000;

/// How long an open-file record survives without being re-put.
///
/// This is a safety net for handles the filesystem layer never closed.
pub const OPEN_FILES_EXPIRE_TIME: Duration = Duration::from_secs(24 * 60 * 60);

// ═══════════════════════════════════════════════════════════════════════════════
// LEASE TIMING
// ═══════════════════════════════════════════════════════════════════════════════

/// Reference lease duration that [`LEASE_RENEW_INTERVAL`] is sized against.
///
/// Callers pick the actual duration when acquiring a lease; any non-zero
/// duration is accepted.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(60);

/// Sleep between two renewal cycles.
///
/// Must stay well below [`DEFAULT_LEASE_DURATION`] so a lease gets several
/// renewal chances before it lapses.
pub const LEASE_RENEW_INTERVAL: Duration = Duration::from_secs(15);

/// Name given to the renewal daemon thread.
pub const LEASE_RENEWER_THREAD_NAME: &str = "blobfs-lease-renewer";

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Overrides [`OPEN_FILES_INIT_CAPACITY`].
pub const ENV_INIT_CAPACITY: &str = "BLOBFS_OPEN_FILES_INIT_CAPACITY";

/// Overrides [`OPEN_FILES_MAX_CAPACITY`].
pub const ENV_MAX_CAPACITY: &str = "BLOBFS_OPEN_FILES_MAX_CAPACITY";

/// Overrides [`OPEN_FILES_EXPIRE_TIME`], in seconds.
pub const ENV_EXPIRE_SECS: &str = "BLOBFS_OPEN_FILES_EXPIRE_SECS";

/// Overrides [`LEASE_RENEW_INTERVAL`], in milliseconds.
pub const ENV_RENEW_INTERVAL_MS: &str = "BLOBFS_LEASE_RENEW_INTERVAL_MS";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renew_interval_below_lease_duration() {
        // At least three renewal attempts per lease lifetime
        assert!(LEASE_RENEW_INTERVAL * 3 <= DEFAULT_LEASE_DURATION);
    }

    #[test]
    fn test_init_capacity_within_max() {
        assert!(OPEN_FILES_INIT_CAPACITY <= OPEN_FILES_MAX_CAPACITY);
    }

    #[test]
    fn test_env_keys_unique() {
        let keys = [
            ENV_INIT_CAPACITY,
            ENV_MAX_CAPACITY,
            ENV_EXPIRE_SECS,
            ENV_RENEW_INTERVAL_MS,
        ];

        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Environment keys must be unique");
                }
            }
        }
    }
}

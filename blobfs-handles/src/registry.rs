//! The open-file registry.
//!
//! Wraps the handle cache and owns the renewal daemon. One process-wide
//! instance is available through [`OpenFileRegistry::global_or_init`];
//! standalone instances can be built with [`OpenFileRegistry::new`].

use std::sync::{Arc, OnceLock};

use parking_lot::{const_mutex, Mutex};
use tracing::{debug, info, instrument};

use blobfs_cache::{CacheStats, ExpiringCache};
use blobfs_core::error::Result;
use blobfs_core::traits::BlobClient;
use blobfs_core::types::OpenFileRecord;

use crate::config::RegistryConfig;
use crate::renewer::{HandleStore, LeaseRenewer, RenewalDaemon, RenewerStats};

static GLOBAL: OnceLock<OpenFileRegistry> = OnceLock::new();
static GLOBAL_INIT: Mutex<()> = const_mutex(());

/// Registry of open file handles with automatic lease renewal.
///
/// `put`, `get`, `delete` and `count` go straight to the underlying
/// [`ExpiringCache`]; see its docs for expiration and capacity rules.
/// The renewal daemon starts when the registry is built and stops on
/// [`shutdown`](Self::shutdown) or drop.
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently with each
/// other and with the daemon.
pub struct OpenFileRegistry {
    store: Arc<HandleStore>,
    renewer: Arc<LeaseRenewer>,
    daemon: RenewalDaemon,
    config: RegistryConfig,
}

impl OpenFileRegistry {
    /// Builds a registry and starts its renewal daemon.
    pub fn new(config: RegistryConfig, client: Arc<dyn BlobClient>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(ExpiringCache::with_config(config.cache_config()));
        let renewer = Arc::new(LeaseRenewer::new(store.clone(), client));
        let daemon = RenewalDaemon::spawn(renewer.clone(), config.renew_interval)?;

        info!(
            max_capacity = config.max_capacity,
            expire_secs = config.expire_time.as_secs(),
            renew_interval_ms = config.renew_interval.as_millis() as u64,
            "Open file registry ready"
        );

        Ok(Self {
            store,
            renewer,
            daemon,
            config,
        })
    }

    /// Returns the process-wide registry, building it on first use.
    ///
    /// The first caller constructs it from [`RegistryConfig::from_env`] and
    /// the client returned by `client`; concurrent first callers block until
    /// that single construction finishes. Later calls never invoke `client`.
    pub fn global_or_init<F>(client: F) -> Result<&'static Self>
    where
        F: FnOnce() -> Arc<dyn BlobClient>,
    {
        if let Some(registry) = GLOBAL.get() {
            return Ok(registry);
        }

        let _init = GLOBAL_INIT.lock();
        if let Some(registry) = GLOBAL.get() {
            return Ok(registry);
        }

        let registry = Self::new(RegistryConfig::from_env(), client())?;
        Ok(GLOBAL.get_or_init(|| registry))
    }

    /// Returns the process-wide registry if it has been built.
    pub fn global() -> Option<&'static Self> {
        GLOBAL.get()
    }

    /// Registers (or replaces) the record for `handle_key`.
    ///
    /// Fails with [`CapacityExceeded`](blobfs_core::BlobFsError::CapacityExceeded)
    /// when the registry is full and `handle_key` is new.
    #[instrument(skip(self, record), fields(blob = %record.blob_reference(), leased = record.has_lease()))]
    pub fn put(&self, handle_key: u64, record: OpenFileRecord) -> Result<()> {
        self.store.put(handle_key, record)?;
        debug!("Handle registered");
        Ok(())
    }

    /// Returns the record for `handle_key` if it is registered and not expired.
    pub fn get(&self, handle_key: u64) -> Option<OpenFileRecord> {
        self.store.get(&handle_key)
    }

    /// Unregisters `handle_key`. No-op if absent.
    #[instrument(skip(self))]
    pub fn delete(&self, handle_key: u64) {
        self.store.delete(&handle_key);
    }

    /// Number of stored handles, expired ones not yet reclaimed included.
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Number of live handles that hold a lease.
    pub fn leased_count(&self) -> usize {
        self.store
            .snapshot()
            .iter()
            .filter(|(_, record)| record.has_lease())
            .count()
    }

    /// Drops expired handles now instead of waiting for lazy reclamation.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    /// Returns handle cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Returns renewal totals since the registry was built.
    pub fn renewer_stats(&self) -> RenewerStats {
        self.renewer.stats()
    }

    /// Returns true while the renewal daemon is alive.
    pub fn is_running(&self) -> bool {
        self.daemon.is_running()
    }

    /// Returns the configuration the registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Stops the renewal daemon and waits for it to exit.
    ///
    /// Registered handles stay readable, but their leases are no longer
    /// renewed. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.daemon.shutdown();
    }
}

/// Stops the process-wide registry's daemon, if the registry was ever built.
pub fn shutdown_global() {
    if let Some(registry) = GLOBAL.get() {
        registry.shutdown();
    }
}

//! Background lease renewal.
//!
//! [`LeaseRenewer`] runs one pass over the open handles and renews every
//! lease it finds. [`RenewalDaemon`] drives it from a dedicated thread at a
//! fixed interval until told to stop.
//!
//! # Consistency
//!
//! Each cycle works on a snapshot of the live handles taken at scan time. A
//! handle registered mid-scan waits for the next cycle; a handle closed
//! mid-scan may get one last renewal. No map lock is held while the blob
//! client is being called.
//!
//! # Failures
//!
//! A failed renewal is logged and counted, and the handle stays registered.
//! The owner of the handle finds out on its next I/O against the blob.
//! A panicking blob client is contained to the entry that triggered it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use blobfs_cache::ExpiringCache;
use blobfs_core::constants::LEASE_RENEWER_THREAD_NAME;
use blobfs_core::error::{BlobFsError, Result};
use blobfs_core::traits::BlobClient;
use blobfs_core::types::OpenFileRecord;

/// Handle store shared between the registry and the renewer.
pub type HandleStore = ExpiringCache<u64, OpenFileRecord>;

/// Outcome of a single renewal cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Live handles seen in the snapshot
    pub scanned: usize,
    /// Handles with a lease, i.e. renewal calls issued
    pub attempted: usize,
    /// Renewal calls that succeeded
    pub renewed: usize,
    /// Renewal calls that failed
    pub failed: usize,
}

/// Totals across all cycles run by a renewer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewerStats {
    /// Completed cycles
    pub cycles: u64,
    /// Renewal calls issued
    pub attempted: u64,
    /// Renewal calls that succeeded
    pub renewed: u64,
    /// Renewal calls that failed
    pub failed: u64,
}

#[derive(Debug, Default)]
struct RenewerCounters {
    cycles: AtomicU64,
    attempted: AtomicU64,
    renewed: AtomicU64,
    failed: AtomicU64,
}

/// Renews the leases of registered handles.
pub struct LeaseRenewer {
    store: Arc<HandleStore>,
    client: Arc<dyn BlobClient>,
    counters: RenewerCounters,
}

impl LeaseRenewer {
    /// Creates a renewer over `store` that renews through `client`.
    pub fn new(store: Arc<HandleStore>, client: Arc<dyn BlobClient>) -> Self {
        Self {
            store,
            client,
            counters: RenewerCounters::default(),
        }
    }

    /// Runs one full renewal pass.
    pub fn run_cycle(&self) -> CycleReport {
        self.cycle(|| false)
    }

    /// Runs one pass, giving up early once `stopped` turns true.
    fn cycle(&self, stopped: impl Fn() -> bool) -> CycleReport {
        let snapshot = self.store.snapshot();
        let mut report = CycleReport {
            scanned: snapshot.len(),
            ..CycleReport::default()
        };

        for (handle_key, record) in snapshot {
            if stopped() {
                debug!("Stop requested, abandoning renewal cycle");
                break;
            }
            let Some(lease_id) = record.active_lease() else {
                continue;
            };

            report.attempted += 1;
            match self.renew(&record, lease_id) {
                Ok(()) => {
                    report.renewed += 1;
                    debug!(handle_key, blob = %record.blob_reference(), "Lease renewed");
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        handle_key,
                        container = %record.container,
                        blob = %record.blob_name,
                        error = %err,
                        "Lease renewal failed"
                    );
                }
            }
        }

        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        self.counters.attempted.fetch_add(report.attempted as u64, Ordering::Relaxed);
        self.counters.renewed.fetch_add(report.renewed as u64, Ordering::Relaxed);
        self.counters.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        report
    }

    fn renew(&self, record: &OpenFileRecord, lease_id: &str) -> Result<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let blob = self
                .client
                .resolve_blob_reference(&record.container, &record.blob_name)?;
            self.client.renew_lease(&blob, lease_id)
        }));

        outcome.unwrap_or_else(|_| {
            error!(handle_key = record.handle_key, "Blob client panicked during lease renewal");
            Err(BlobFsError::InternalError("blob client panicked during lease renewal".into()))
        })
    }

    /// Returns totals across all cycles so far.
    pub fn stats(&self) -> RenewerStats {
        RenewerStats {
            cycles: self.counters.cycles.load(Ordering::Relaxed),
            attempted: self.counters.attempted.load(Ordering::Relaxed),
            renewed: self.counters.renewed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

/// Stop flag the daemon can sleep on.
#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleeps up to `timeout`. Returns true if a stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// Logs loudly if the daemon thread ends without having been asked to.
struct ExitGuard<'a> {
    stop: &'a StopSignal,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if self.stop.is_stopped() {
            info!("Lease renewal daemon stopped");
        } else {
            error!("Lease renewal daemon exited unexpectedly; open handles will lose their leases");
        }
    }
}

/// Thread running a [`LeaseRenewer`] at a fixed interval.
///
/// The thread does not keep the process alive. Dropping the daemon stops and
/// joins it.
pub struct RenewalDaemon {
    stop: Arc<StopSignal>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RenewalDaemon {
    /// Starts the renewal thread.
    pub fn spawn(renewer: Arc<LeaseRenewer>, interval: Duration) -> Result<Self> {
        let stop = Arc::new(StopSignal::default());
        let thread_stop = stop.clone();

        let handle = thread::Builder::new()
            .name(LEASE_RENEWER_THREAD_NAME.to_string())
            .spawn(move || Self::run(&renewer, interval, &thread_stop))?;

        Ok(Self {
            stop,
            handle: Mutex::new(Some(handle)),
        })
    }

    fn run(renewer: &LeaseRenewer, interval: Duration, stop: &StopSignal) {
        let _guard = ExitGuard { stop };
        info!(interval_ms = interval.as_millis() as u64, "Lease renewal daemon started");

        while !stop.is_stopped() {
            let started = Instant::now();
            match panic::catch_unwind(AssertUnwindSafe(|| renewer.cycle(|| stop.is_stopped()))) {
                Ok(report) if report.attempted > 0 => info!(
                    scanned = report.scanned,
                    renewed = report.renewed,
                    failed = report.failed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Lease renewal cycle complete"
                ),
                Ok(report) => debug!(scanned = report.scanned, "No leases to renew"),
                Err(_) => error!("Lease renewal cycle aborted; retrying after the interval"),
            }

            if stop.wait(interval) {
                break;
            }
        }
    }

    /// Returns true while the renewal thread is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the thread to stop and waits for it to exit.
    ///
    /// Returns once any in-flight renewal call has finished. Safe to call more
    /// than once and from several threads; every caller waits for the exit.
    pub fn shutdown(&self) {
        self.stop.stop();
        // Held across the join so concurrent callers block until the thread is gone
        let mut handle = self.handle.lock();
        if let Some(handle) = handle.take() {
            if handle.join().is_err() {
                error!("Lease renewal daemon panicked; leases are no longer being renewed");
            }
        }
    }
}

impl Drop for RenewalDaemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}

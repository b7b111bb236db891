//! BlobFS CLI
//!
//! Drives the open-file registry against an in-memory blob store, to watch
//! lease renewal and capacity behavior without a storage account.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blobfs_blob::{LeaseState, MemoryBlobStore};
use blobfs_core::types::{BlobReference, OpenFileRecord};
use blobfs_handles::{OpenFileRegistry, RegistryConfig};

/// BlobFS - open-file registry with automatic blob lease renewal
#[derive(Parser)]
#[command(name = "blobfs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open handles against an in-memory store and let the daemon renew them
    Simulate {
        /// Number of handles to open
        #[arg(long, default_value = "8")]
        handles: u64,
        /// How many of them hold a lease
        #[arg(long, default_value = "5")]
        leased: u64,
        /// Container to create the blobs in
        #[arg(long, default_value = "blobfs")]
        container: String,
        /// Lease duration in milliseconds
        #[arg(long, default_value = "1000")]
        lease_ms: u64,
        /// Sleep between renewal cycles in milliseconds
        #[arg(long, default_value = "250")]
        interval_ms: u64,
        /// How long to keep the handles open, in milliseconds
        #[arg(long, default_value = "3000")]
        run_ms: u64,
    },

    /// Print the effective registry configuration as JSON
    Config,
}

/// A handle opened by the simulation.
struct OpenedHandle {
    handle_key: u64,
    blob: BlobReference,
    lease_id: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "blobfs=debug,info"
    } else {
        "blobfs=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Simulate {
            handles,
            leased,
            container,
            lease_ms,
            interval_ms,
            run_ms,
        } => cmd_simulate(
            handles,
            leased.min(handles),
            &container,
            Duration::from_millis(lease_ms),
            Duration::from_millis(interval_ms),
            Duration::from_millis(run_ms),
        ),
        Commands::Config => cmd_config(),
    }
}

/// Open handles, keep them open for a while, report lease health, close them.
fn cmd_simulate(
    handles: u64,
    leased: u64,
    container: &str,
    lease: Duration,
    interval: Duration,
    run_for: Duration,
) -> Result<()> {
    println!("{}", "📂 Simulating open handles...".cyan().bold());

    let blobs = Arc::new(MemoryBlobStore::new());
    blobs.create_container(container);

    let config = RegistryConfig::from_env().with_renew_interval(interval);
    let capacity = handle_capacity(handles, config.max_capacity)?;
    let registry =
        OpenFileRegistry::new(config, blobs.clone()).context("failed to start open file registry")?;

    let mut opened = Vec::with_capacity(capacity);
    for handle_key in 1..=handles {
        let name = format!("file-{handle_key:04}.dat");
        let blob = blobs.put_blob(container, &name)?;

        let mut record = OpenFileRecord::new(handle_key, container, &name);
        let lease_id = if handle_key <= leased {
            let id = blobs
                .acquire_lease(&blob, lease)
                .with_context(|| format!("failed to lease {blob}"))?;
            record = record.with_lease(id.clone());
            Some(id)
        } else {
            None
        };

        registry
            .put(handle_key, record)
            .with_context(|| format!("failed to register handle {handle_key}"))?;
        opened.push(OpenedHandle {
            handle_key,
            blob,
            lease_id,
        });
    }

    println!(
        "   Opened {} handles ({} leased), lease {}ms, renewal every {}ms",
        handles,
        leased,
        lease.as_millis(),
        interval.as_millis()
    );
    info!(run_ms = run_for.as_millis() as u64, "Holding handles open");
    thread::sleep(run_for);

    println!();
    println!("{}", "Lease health".bold());
    for handle in &opened {
        let state = blobs.lease_state(&handle.blob)?;
        let label = match (state, handle.lease_id.is_some()) {
            (LeaseState::Leased, _) => "leased".green(),
            (LeaseState::Expired, _) => "expired".red().bold(),
            (LeaseState::Available, true) => "lost".red(),
            (LeaseState::Available, false) => "no lease".dimmed(),
        };
        println!("   #{:<4} {:<32} {}", handle.handle_key, handle.blob.to_string(), label);
    }

    let cache = registry.stats();
    let renewals = registry.renewer_stats();
    println!();
    println!("{}", "Registry".bold());
    println!("   Handles:   {} / {}", cache.live_entries, cache.capacity);
    println!("   Leased:    {}", registry.leased_count());
    println!("   Cycles:    {}", renewals.cycles);
    println!(
        "   Renewals:  {} ok, {} failed",
        renewals.renewed.to_string().green(),
        renewals.failed.to_string().red()
    );

    for handle in opened {
        registry.delete(handle.handle_key);
        if let Some(lease_id) = handle.lease_id {
            blobs
                .release_lease(&handle.blob, &lease_id)
                .with_context(|| format!("failed to release lease on {}", handle.blob))?;
        }
    }
    registry.shutdown();

    println!();
    println!("{}", "✅ All handles closed".green().bold());
    Ok(())
}

/// Rejects handle counts the registry could never hold.
fn handle_capacity(handles: u64, max_capacity: usize) -> Result<usize> {
    match usize::try_from(handles) {
        Ok(count) if count <= max_capacity => Ok(count),
        _ => bail!("--handles {handles} exceeds the registry capacity of {max_capacity}"),
    }
}

/// Print the configuration the registry would be built with.
fn cmd_config() -> Result<()> {
    let config = RegistryConfig::from_env();
    config.validate().context("configuration is invalid")?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_capacity_within_registry() {
        assert_eq!(handle_capacity(8, 10_000).unwrap(), 8);
        assert_eq!(handle_capacity(10_000, 10_000).unwrap(), 10_000);
    }

    #[test]
    fn test_handle_capacity_rejects_oversized_count() {
        assert!(handle_capacity(10_001, 10_000).is_err());
        assert!(handle_capacity(u64::MAX, 10_000).is_err());
    }
}

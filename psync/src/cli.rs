//! CLI surface for psync: command parsing, argument exposure, and the glue
//! between config, directory client, device client and the sync driver.
//!
//! All reconciliation logic lives in `psync-core`; this module is strictly
//! CLI glue. The async [`run`] entrypoint is public so integration tests
//! can invoke commands without spawning the binary.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use psync_core::audit::AuditWriter;
use psync_core::contract::{DeviceClient, DirectoryClient};
use psync_core::snapshot::build_snapshot;
use psync_core::synchronise::synchronise;

use crate::device::HttpDeviceClient;
use crate::directory::LdapDirectory;
use crate::load_config::load_config;

/// CLI for psync: reconcile printer address books against a directory
/// service.
#[derive(Parser)]
#[clap(
    name = "psync",
    version,
    about = "Reconcile printer address books against a directory service"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile every configured printer, writing addition and removal
    /// audit logs
    Export {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Path of the additions audit log
        #[clap(short = 'a', long)]
        add_log: PathBuf,
        /// Path of the removals audit log
        #[clap(short = 'r', long)]
        remove_log: PathBuf,
    },
    /// List the users currently stored on every configured printer
    List {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main().
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Export {
            config,
            add_log,
            remove_log,
        } => {
            let config = load_config(config)?;
            let options = config.sync_options();
            options.trace_loaded();

            info!(command = "export", "Starting directory search");
            let directory = LdapDirectory::new(&config.directory);
            let records = directory.search_users().await?;
            let snapshot = build_snapshot(&records, &config.directory.additions);
            info!(users = snapshot.len(), "Directory snapshot built");

            let add_file = File::create(&add_log)
                .with_context(|| format!("Failed to create addition log {add_log:?}"))?;
            let remove_file = File::create(&remove_log)
                .with_context(|| format!("Failed to create removal log {remove_log:?}"))?;
            let mut audit =
                AuditWriter::new(BufWriter::new(add_file), BufWriter::new(remove_file))?;

            let client = HttpDeviceClient::new(options.device_timeout)?;
            let result = synchronise(
                &client,
                &config.devices(),
                &snapshot,
                &mut audit,
                &options,
            )
            .await;
            audit.flush().context("Failed to flush audit logs")?;
            let report = result?;

            match serde_json::to_string_pretty(&report) {
                Ok(json) => debug!(json = %json, "Sync report"),
                Err(e) => error!(error = ?e, "Failed to serialize sync report"),
            }
            info!(
                command = "export",
                added = report.total_added(),
                removed = report.total_removed(),
                failed_devices = report.failures.len(),
                "Export complete"
            );
            Ok(())
        }
        Commands::List { config } => {
            use psync_core::contract::DeviceSession as _;

            let config = load_config(config)?;
            let options = config.sync_options();
            let client = HttpDeviceClient::new(options.device_timeout)?;

            for device in config.devices() {
                let mut session = client
                    .open(&device)
                    .await
                    .with_context(|| format!("Failed to open device {}", device.name))?;
                let listing = session.list_users().await;
                let closed = session.close().await;

                let users =
                    listing.with_context(|| format!("Failed to list device {}", device.name))?;
                for user in &users {
                    let values: Vec<&str> = user.field_values().collect();
                    println!("{},{}", values.join(","), device.name);
                }
                closed.with_context(|| format!("Failed to close device {}", device.name))?;
                info!(device = %device.name, users = users.len(), "Listed device");
            }
            Ok(())
        }
    }
}

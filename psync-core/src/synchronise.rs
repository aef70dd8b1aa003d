//! Top-level driver: reconciles every configured device against the
//! directory snapshot, strictly sequentially, threading the discovered
//! removal-log schema from one device to the next.
//!
//! One device is fully processed (open session, list, decide, mutate,
//! close) before the next begins. The session is released on every exit
//! path, including a failed pass. By default the first device failure
//! aborts the remaining run; with
//! [`SyncOptions::continue_on_device_error`] failures are collected into
//! the report instead and the run proceeds. Audit lines written before a
//! failure stay on disk either way.

use std::io::Write;

use serde::Serialize;
use tracing::{error, info};

use crate::audit::{AuditWriter, FieldSchema};
use crate::config::SyncOptions;
use crate::contract::{DeviceClient, DeviceConnection};
use crate::error::SyncError;
use crate::reconcile::{reconcile_device, with_timeout, DeviceReport};
use crate::snapshot::Snapshot;

/// A device whose pass failed while the run was configured to continue.
#[derive(Debug, Serialize)]
pub struct DeviceFailure {
    pub device: String,
    pub error: String,
}

/// Outcome of a full sync run.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub devices: Vec<DeviceReport>,
    pub failures: Vec<DeviceFailure>,
}

impl SyncReport {
    pub fn total_added(&self) -> usize {
        self.devices.iter().map(|d| d.added.len()).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.devices.iter().map(|d| d.removed.len()).sum()
    }
}

/// Reconcile all configured devices, in configuration order.
pub async fn synchronise<C, W>(
    client: &C,
    devices: &[DeviceConnection],
    snapshot: &Snapshot,
    audit: &mut AuditWriter<W>,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError>
where
    C: DeviceClient + ?Sized,
    W: Write,
{
    info!(
        devices = devices.len(),
        directory_users = snapshot.len(),
        "Starting sync run"
    );

    let mut schema: Option<FieldSchema> = None;
    let mut report = SyncReport {
        devices: Vec::new(),
        failures: Vec::new(),
    };

    for device in devices {
        info!(device = %device.name, address = %device.address, "Reconciling device");
        match sync_device(client, device, snapshot, &mut schema, audit, options).await {
            Ok(device_report) => {
                info!(
                    device = %device.name,
                    added = device_report.added.len(),
                    removed = device_report.removed.len(),
                    "Device reconciled"
                );
                report.devices.push(device_report);
            }
            Err(err) if options.continue_on_device_error => {
                error!(device = %device.name, error = %err, "Device pass failed, continuing with remaining devices");
                report.failures.push(DeviceFailure {
                    device: device.name.clone(),
                    error: err.to_string(),
                });
            }
            Err(err) => {
                error!(device = %device.name, error = %err, "Device pass failed, aborting run");
                return Err(err);
            }
        }
    }

    info!(
        added = report.total_added(),
        removed = report.total_removed(),
        failed_devices = report.failures.len(),
        "Sync run complete"
    );
    Ok(report)
}

/// Open a session for one device, reconcile it, and close the session on
/// every exit path.
async fn sync_device<C, W>(
    client: &C,
    device: &DeviceConnection,
    snapshot: &Snapshot,
    schema: &mut Option<FieldSchema>,
    audit: &mut AuditWriter<W>,
    options: &SyncOptions,
) -> Result<DeviceReport, SyncError>
where
    C: DeviceClient + ?Sized,
    W: Write,
{
    let mut session = with_timeout(options.device_timeout, client.open(device))
        .await
        .map_err(|source| SyncError::device(&device.name, source))?;

    let outcome = reconcile_device(
        session.as_ref(),
        &device.name,
        snapshot,
        schema,
        audit,
        options,
    )
    .await;

    let closed = with_timeout(options.device_timeout, session.close()).await;

    let device_report = outcome?;
    closed.map_err(|source| SyncError::device(&device.name, source))?;
    Ok(device_report)
}

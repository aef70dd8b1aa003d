//! Per-device reconciliation: one pass over a device's user store, deciding
//! keep/remove for every device user and add for every directory user the
//! device is missing.
//!
//! Matching is keyed solely on lowercased email. Decisions are applied
//! against the device immediately and audited as they happen, so a failure
//! mid-pass leaves earlier mutations applied and earlier audit lines
//! written; there is no rollback. Device errors propagate wrapped with the
//! device name, in the device client's own kind.

use std::collections::HashSet;
use std::future::Future;
use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::audit::{AuditWriter, FieldSchema};
use crate::config::{MissingMailPolicy, SyncOptions};
use crate::contract::{DeviceSession, DeviceUser, NewDeviceUser};
use crate::error::{DeviceError, SyncError};
use crate::snapshot::Snapshot;

/// One user removed from a device during reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct RemovalRecord {
    pub user_id: String,
    pub name: String,
    pub mail: String,
}

/// One user added to a device during reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct AdditionRecord {
    pub user_id: String,
    pub display_name: String,
    pub mail: String,
}

/// What one device's reconciliation pass did, in decision order.
#[derive(Debug, Serialize)]
pub struct DeviceReport {
    pub device: String,
    pub removed: Vec<RemovalRecord>,
    pub added: Vec<AdditionRecord>,
}

/// Run a device-client future under the configured per-call timeout.
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, DeviceError>
where
    F: Future<Output = Result<T, DeviceError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeviceError::Timeout(limit)),
    }
}

/// Reconcile one device against the directory snapshot.
///
/// `schema` is the run-wide discovered-schema cell: empty until the first
/// device user of the run is seen, then fixed. Capturing it also writes the
/// removal-log header. The session is NOT closed here; the caller owns the
/// session lifecycle (see [`crate::synchronise`]).
pub async fn reconcile_device<W: Write>(
    session: &dyn DeviceSession,
    device_name: &str,
    snapshot: &Snapshot,
    schema: &mut Option<FieldSchema>,
    audit: &mut AuditWriter<W>,
    options: &SyncOptions,
) -> Result<DeviceReport, SyncError> {
    let device_err = |source| SyncError::device(device_name, source);

    let users = with_timeout(options.device_timeout, session.list_users())
        .await
        .map_err(device_err)?;
    debug!(device = device_name, users = users.len(), "Listed device users");

    let mut report = DeviceReport {
        device: device_name.to_string(),
        removed: Vec::new(),
        added: Vec::new(),
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut schema_mismatch_logged = false;

    for user in &users {
        if schema.is_none() {
            let discovered = FieldSchema::from_user(user);
            debug!(device = device_name, fields = ?discovered.fields(), "Captured removal-log field schema");
            audit.write_removal_header(&discovered)?;
            *schema = Some(discovered);
        } else if let Some(known) = schema.as_ref() {
            if !schema_mismatch_logged && !known.matches(user) {
                warn!(
                    device = device_name,
                    expected = ?known.fields(),
                    "Device reports a different field set than the captured schema; keeping the captured schema"
                );
                schema_mismatch_logged = true;
            }
        }

        let mail = user.mail_address().to_lowercase();
        if mail.is_empty() {
            match options.missing_mail {
                MissingMailPolicy::Ignore => {
                    debug!(device = device_name, user = %user.name(), "Ignoring device user without an email address");
                }
                MissingMailPolicy::Remove => {
                    remove_user(session, device_name, user, audit, &mut report, options).await?;
                }
            }
            continue;
        }

        if snapshot.contains(&mail) {
            seen.insert(mail);
        } else {
            remove_user(session, device_name, user, audit, &mut report, options).await?;
        }
    }

    for dir_user in snapshot.iter() {
        if seen.contains(&dir_user.mail.to_lowercase()) {
            continue;
        }
        warn!(
            device = device_name,
            tag = dir_user.tag,
            user = %dir_user.display_name,
            mail = %dir_user.mail,
            "Adding user missing from device"
        );
        let request = NewDeviceUser {
            user_id: &dir_user.id,
            name: &dir_user.full_name,
            display_name: &dir_user.display_name,
            email: &dir_user.mail,
        };
        with_timeout(options.device_timeout, session.add_user(request))
            .await
            .map_err(device_err)?;
        audit.append_addition(dir_user, device_name)?;
        report.added.push(AdditionRecord {
            user_id: dir_user.id.clone(),
            display_name: dir_user.display_name.clone(),
            mail: dir_user.mail.clone(),
        });
    }

    Ok(report)
}

async fn remove_user<W: Write>(
    session: &dyn DeviceSession,
    device_name: &str,
    user: &DeviceUser,
    audit: &mut AuditWriter<W>,
    report: &mut DeviceReport,
    options: &SyncOptions,
) -> Result<(), SyncError> {
    warn!(
        device = device_name,
        user = %user.name(),
        mail = %user.mail_address(),
        "Removing user missing from directory"
    );
    with_timeout(options.device_timeout, session.delete_user(user.id()))
        .await
        .map_err(|source| SyncError::device(device_name, source))?;
    audit.append_removal(user, device_name)?;
    report.removed.push(RemovalRecord {
        user_id: user.id().to_string(),
        name: user.name().to_string(),
        mail: user.mail_address().to_lowercase(),
    });
    Ok(())
}

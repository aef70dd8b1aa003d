//! Error taxonomy for a sync run.
//!
//! Collaborator clients keep their own error kinds ([`DirectoryError`],
//! [`DeviceError`]); the reconciler and driver wrap them into [`SyncError`]
//! without transforming the underlying kind. A failed directory bind or
//! device call never yields a usable handle, only an error value.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a directory client. Bind and connect failures are a
/// distinct kind from search failures so callers can tell an unreachable or
/// misconfigured server apart from a bad query.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory connection failed: {0}")]
    Connection(String),

    #[error("directory search failed: {0}")]
    Search(String),
}

/// Errors raised by a device client or session.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device connection failed: {0}")]
    Connection(String),

    #[error("device operation failed: {0}")]
    Operation(String),

    #[error("device call timed out after {0:?}")]
    Timeout(Duration),
}

/// Run-level error. One device's failure carries the device name so the
/// operator can tell which printer halted the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("device {device}: {source}")]
    Device {
        device: String,
        source: DeviceError,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("audit log write failed: {0}")]
    Audit(#[from] std::io::Error),
}

impl SyncError {
    /// Wrap a device client error with the name of the device it came from.
    pub fn device(name: &str, source: DeviceError) -> Self {
        SyncError::Device {
            device: name.to_string(),
            source,
        }
    }
}

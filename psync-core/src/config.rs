use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What to do with a device user whose email field is empty.
///
/// Such a user can never match a directory entry, so under [`Ignore`] it is
/// neither removed nor counted as present, and the directory user it may
/// have been created from gets re-added on every run. [`Remove`] deletes
/// these records instead, so repeated additions cannot accumulate.
///
/// [`Ignore`]: MissingMailPolicy::Ignore
/// [`Remove`]: MissingMailPolicy::Remove
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingMailPolicy {
    #[default]
    Ignore,
    Remove,
}

/// Knobs for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub missing_mail: MissingMailPolicy,
    /// Collect per-device failures and keep going instead of halting the run.
    pub continue_on_device_error: bool,
    /// Applied to every individual device call.
    pub device_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            missing_mail: MissingMailPolicy::Ignore,
            continue_on_device_error: false,
            device_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncOptions {
    pub fn trace_loaded(&self) {
        info!(
            missing_mail = ?self.missing_mail,
            continue_on_device_error = self.continue_on_device_error,
            device_timeout_secs = self.device_timeout.as_secs(),
            "Loaded sync options"
        );
        debug!(?self, "Sync options (full debug)");
    }
}

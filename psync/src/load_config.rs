//! Loads and adapts the static YAML config, including environment secret
//! injection, into the core's strongly-typed structs.
//!
//! This module is the only place where untrusted YAML is parsed. The
//! YAML-side section types stay here; they are mapped onto
//! [`psync_core::contract::DeviceConnection`] and
//! [`psync_core::config::SyncOptions`] before anything reaches the core.
//! All errors use `anyhow::Error` for context-rich diagnostics, surfaced at
//! the CLI boundary.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use psync_core::config::{MissingMailPolicy, SyncOptions};
use psync_core::contract::DeviceConnection;
use psync_core::snapshot::DirectoryUser;

/// Environment variable overriding `directory.bind_password`.
pub const BIND_PASSWORD_ENV: &str = "PSYNC_BIND_PASSWORD";

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub directory: DirectorySection,
    #[serde(default)]
    pub printers: Vec<PrinterSection>,
    #[serde(default)]
    pub sync: SyncSection,
}

#[derive(Debug, Deserialize)]
pub struct DirectorySection {
    /// LDAP URL, e.g. `ldap://ad.example.org:389`.
    pub server: String,
    pub bind_dn: String,
    #[serde(default)]
    pub bind_password: String,
    pub base_dn: String,
    pub filter: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Pre-shaped users merged into the snapshot after the directory
    /// results, last-writer-wins.
    #[serde(default)]
    pub additions: Vec<DirectoryUser>,
}

#[derive(Debug, Deserialize)]
pub struct PrinterSection {
    pub name: String,
    pub address: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub missing_mail: MissingMailPolicy,
    pub continue_on_device_error: bool,
    pub device_timeout_secs: Option<u64>,
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl CliConfig {
    /// Device connections in configuration order.
    pub fn devices(&self) -> Vec<DeviceConnection> {
        self.printers
            .iter()
            .map(|p| DeviceConnection {
                name: p.name.clone(),
                address: p.address.clone(),
                username: p.user.clone(),
                password: p.password.clone(),
            })
            .collect()
    }

    pub fn sync_options(&self) -> SyncOptions {
        let defaults = SyncOptions::default();
        SyncOptions {
            missing_mail: self.sync.missing_mail,
            continue_on_device_error: self.sync.continue_on_device_error,
            device_timeout: self
                .sync
                .device_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.device_timeout),
        }
    }
}

/// Load the YAML config file and inject secret overrides from the
/// environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            config
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Ok(password) = std::env::var(BIND_PASSWORD_ENV) {
        info!(env = BIND_PASSWORD_ENV, "Overriding bind password from environment");
        config.directory.bind_password = password;
    }

    Ok(config)
}

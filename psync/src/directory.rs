//! LDAP implementation of the directory client.
//!
//! One connect-bind-search-unbind round trip per run. A failed connect or
//! bind surfaces as [`DirectoryError::Connection`]; callers never receive a
//! client value wrapping a dead connection.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{info, warn};

use psync_core::contract::{DirectoryClient, DirectoryRecord};
use psync_core::error::DirectoryError;

use crate::load_config::DirectorySection;

const ATTR_MAIL: &str = "mail";
const ATTR_GIVEN_NAME: &str = "givenName";
const ATTR_SURNAME: &str = "sn";

pub struct LdapDirectory {
    server: String,
    bind_dn: String,
    bind_password: String,
    base_dn: String,
    filter: String,
    connect_timeout: Duration,
}

impl LdapDirectory {
    pub fn new(section: &DirectorySection) -> Self {
        Self {
            server: section.server.clone(),
            bind_dn: section.bind_dn.clone(),
            bind_password: section.bind_password.clone(),
            base_dn: section.base_dn.clone(),
            filter: section.filter.clone(),
            connect_timeout: Duration::from_secs(section.connect_timeout_secs),
        }
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    async fn search_users(&self) -> Result<Vec<DirectoryRecord>, DirectoryError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.server)
            .await
            .map_err(|e| {
                DirectoryError::Connection(format!(
                    "failed to connect to {}: {e}",
                    self.server
                ))
            })?;

        // ldap3 multiplexes all operations over this driver task.
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        info!(server = %self.server, bind_dn = %self.bind_dn, "Connecting to directory");
        let bind = ldap
            .simple_bind(&self.bind_dn, &self.bind_password)
            .await
            .map_err(|e| {
                DirectoryError::Connection(format!("LDAP bind failed for {}: {e}", self.bind_dn))
            })?;
        if bind.rc != 0 {
            return Err(DirectoryError::Connection(format!(
                "LDAP bind failed with code {}: {}",
                bind.rc, bind.text
            )));
        }
        info!("LDAP bind successful");

        let result = ldap
            .search(
                &self.base_dn,
                Scope::Subtree,
                &self.filter,
                vec![ATTR_MAIL, ATTR_GIVEN_NAME, ATTR_SURNAME],
            )
            .await
            .map_err(|e| DirectoryError::Search(e.to_string()))?;
        let (entries, _) = result
            .success()
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        let records: Vec<DirectoryRecord> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryRecord {
                mail: first_attr(&entry, ATTR_MAIL),
                given_name: first_attr(&entry, ATTR_GIVEN_NAME),
                surname: first_attr(&entry, ATTR_SURNAME),
            })
            .collect();
        info!(records = records.len(), "Directory search complete");

        if let Err(e) = ldap.unbind().await {
            warn!(error = %e, "Error during LDAP unbind");
        }

        Ok(records)
    }
}

fn first_attr(entry: &SearchEntry, name: &str) -> Option<String> {
    entry.attrs.get(name).and_then(|values| values.first().cloned())
}

//! Directory snapshot: the canonical user set one sync run reconciles against.
//!
//! Built once per run from a raw directory search plus the configured manual
//! additions, keyed by lowercased email. Insertion order is preserved
//! because the addition audit log is written in snapshot order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::contract::DirectoryRecord;
use crate::tag::tag_index;

/// One canonical user derived from the directory (or configured manually).
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Given name + surname initial, the id stored on devices.
    pub id: String,
    pub full_name: String,
    /// Given name + surname initial, shown on device panels.
    pub display_name: String,
    /// Lowercased email, the reconciliation key.
    pub mail: String,
    /// Display grouping tag, see [`crate::tag`].
    pub tag: u8,
}

/// Mapping of lowercased email to [`DirectoryUser`], preserving insertion
/// order. Overwriting an existing key replaces the value but keeps the
/// original position.
#[derive(Debug, Default)]
pub struct Snapshot {
    users: HashMap<String, DirectoryUser>,
    order: Vec<String>,
}

impl Snapshot {
    /// Insert a user under its lowercased email, last-writer-wins.
    pub fn insert(&mut self, user: DirectoryUser) {
        let key = user.mail.to_lowercase();
        if self.users.insert(key.clone(), user).is_none() {
            self.order.push(key);
        }
    }

    pub fn contains(&self, mail: &str) -> bool {
        self.users.contains_key(&mail.to_lowercase())
    }

    pub fn get(&self, mail: &str) -> Option<&DirectoryUser> {
        self.users.get(&mail.to_lowercase())
    }

    /// Users in insertion order: directory-record order, then manual
    /// additions that did not overwrite an existing entry.
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryUser> {
        self.order.iter().map(|key| &self.users[key])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Build the run's snapshot from raw directory records and the configured
/// manual additions.
///
/// Records without a mail attribute never reach any device and are dropped
/// silently. Records with a mail attribute but no usable given name or
/// surname are dropped with a warning rather than aborting the run.
/// Manual additions merge last and overwrite directory-derived entries with
/// the same email.
pub fn build_snapshot(records: &[DirectoryRecord], additions: &[DirectoryUser]) -> Snapshot {
    let mut snapshot = Snapshot::default();

    for record in records {
        let mail = match record.mail.as_deref() {
            Some(mail) if !mail.is_empty() => mail.to_lowercase(),
            _ => continue,
        };

        let given_name = record.given_name.as_deref().unwrap_or("");
        let surname = record.surname.as_deref().unwrap_or("");
        let surname_initial = match surname.chars().next() {
            Some(c) => c,
            None => {
                warn!(mail = %mail, "Skipping directory record without a surname");
                continue;
            }
        };
        let tag = match tag_index(given_name) {
            Ok(tag) => tag,
            Err(err) => {
                warn!(mail = %mail, error = %err, "Skipping directory record with untaggable given name");
                continue;
            }
        };

        snapshot.insert(DirectoryUser {
            id: format!("{given_name}{surname_initial}"),
            full_name: format!("{given_name} {surname}"),
            display_name: format!("{given_name} {surname_initial}"),
            mail,
            tag,
        });
    }

    for addition in additions {
        snapshot.insert(addition.clone());
    }

    snapshot
}

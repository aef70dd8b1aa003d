//! Collaborator contracts: the directory client and the per-device client.
//!
//! This module is the interface layer only. The reconciliation core consumes
//! these traits; the wire protocols behind them live with the implementors
//! (see the `psync` binary crate for the LDAP and HTTP clients).
//! All traits are annotated for `mockall` so tests can generate
//! deterministic mocks; the mocks are exported under the default
//! `test-export-mocks` feature for dependent crates.

use async_trait::async_trait;
use mockall::automock;

use crate::error::{DeviceError, DirectoryError};

/// One raw record from a directory search. All attributes are optional;
/// the snapshot builder decides which records survive.
#[derive(Debug, Clone, Default)]
pub struct DirectoryRecord {
    pub mail: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
}

/// Connection parameters for one configured device.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeviceConnection {
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: String,
}

/// A single named field of a device user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceField {
    pub name: String,
    pub value: String,
}

impl DeviceField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Well-known field name for a device user's identifier.
pub const FIELD_ID: &str = "id";
/// Well-known field name for a device user's display name.
pub const FIELD_NAME: &str = "name";
/// Well-known field name for a device user's email address.
pub const FIELD_MAIL: &str = "mailaddress";

/// One user record as reported by a device: an ordered list of named fields.
///
/// The field set and order are device-defined and assumed identical across
/// the devices of a run; the removal audit log's schema is discovered from
/// the first record seen. Every device is assumed to expose at least the
/// [`FIELD_ID`], [`FIELD_NAME`] and [`FIELD_MAIL`] fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUser {
    pub fields: Vec<DeviceField>,
}

impl DeviceUser {
    pub fn new(fields: Vec<DeviceField>) -> Self {
        Self { fields }
    }

    /// Look up a field value by name, `""` when the device omits the field.
    pub fn field(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    pub fn id(&self) -> &str {
        self.field(FIELD_ID)
    }

    pub fn name(&self) -> &str {
        self.field(FIELD_NAME)
    }

    pub fn mail_address(&self) -> &str {
        self.field(FIELD_MAIL)
    }

    /// Field names in device-reported order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Field values in device-reported order.
    pub fn field_values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.value.as_str())
    }
}

/// The data passed to a device when creating a user.
pub struct NewDeviceUser<'a> {
    /// Short identifier stored on the device (given name + surname initial).
    pub user_id: &'a str,
    /// Full name.
    pub name: &'a str,
    /// Name shown on the device panel.
    pub display_name: &'a str,
    /// Email address, the reconciliation key.
    pub email: &'a str,
}

/// Trait for resolving the configured directory query into raw user records.
///
/// A failed bind or connect must surface as [`DirectoryError::Connection`];
/// implementations never hand back a client value that failed to connect.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Run the configured query and return every matching raw record.
    async fn search_users(&self) -> Result<Vec<DirectoryRecord>, DirectoryError>;
}

/// Trait for opening a scoped session against one device.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Open a session. The caller is responsible for calling
    /// [`DeviceSession::close`] on every exit path.
    async fn open(&self, device: &DeviceConnection)
        -> Result<Box<dyn DeviceSession>, DeviceError>;
}

/// A live session against one device's user store.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// List the device's current users in device-reported order.
    async fn list_users(&self) -> Result<Vec<DeviceUser>, DeviceError>;

    /// Delete one user by its device identifier.
    async fn delete_user(&self, id: &str) -> Result<(), DeviceError>;

    /// Create one user on the device.
    async fn add_user<'a>(&self, user: NewDeviceUser<'a>) -> Result<(), DeviceError>;

    /// Release the session. Must be safe to call after a failed operation.
    async fn close(&mut self) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_fields_resolve_by_name() {
        let user = DeviceUser::new(vec![
            DeviceField::new("id", "BobS"),
            DeviceField::new("name", "Bob S"),
            DeviceField::new("mailaddress", "bob@example.org"),
            DeviceField::new("faxnumber", ""),
        ]);
        assert_eq!(user.id(), "BobS");
        assert_eq!(user.name(), "Bob S");
        assert_eq!(user.mail_address(), "bob@example.org");
        assert_eq!(user.field("missing"), "");
    }

    #[test]
    fn field_order_is_preserved() {
        let user = DeviceUser::new(vec![
            DeviceField::new("id", "1"),
            DeviceField::new("mailaddress", "a@b.c"),
            DeviceField::new("name", "A"),
        ]);
        let names: Vec<&str> = user.field_names().collect();
        assert_eq!(names, vec!["id", "mailaddress", "name"]);
        let values: Vec<&str> = user.field_values().collect();
        assert_eq!(values, vec!["1", "a@b.c", "A"]);
    }
}

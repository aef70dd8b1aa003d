//! End-to-end reconciliation against an in-memory device fleet: full audit
//! file contents, idempotence, and run-wide schema capture.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serial_test::serial;

use psync_core::audit::AuditWriter;
use psync_core::config::SyncOptions;
use psync_core::contract::{
    DeviceClient, DeviceConnection, DeviceField, DeviceSession, DeviceUser, DirectoryRecord,
    NewDeviceUser,
};
use psync_core::error::DeviceError;
use psync_core::snapshot::build_snapshot;
use psync_core::synchronise::synchronise;

/// In-memory device store shared between a fake client and its sessions,
/// so mutations survive across runs and devices can be re-listed.
#[derive(Clone, Default)]
struct FakeFleet {
    stores: Arc<Mutex<HashMap<String, Vec<DeviceUser>>>>,
}

impl FakeFleet {
    fn seed(&self, device: &str, users: Vec<DeviceUser>) {
        self.stores
            .lock()
            .unwrap()
            .insert(device.to_string(), users);
    }

    fn users(&self, device: &str) -> Vec<DeviceUser> {
        self.stores
            .lock()
            .unwrap()
            .get(device)
            .cloned()
            .unwrap_or_default()
    }
}

struct FakeSession {
    fleet: FakeFleet,
    device: String,
}

#[async_trait]
impl DeviceClient for FakeFleet {
    async fn open(
        &self,
        device: &DeviceConnection,
    ) -> Result<Box<dyn DeviceSession>, DeviceError> {
        Ok(Box::new(FakeSession {
            fleet: self.clone(),
            device: device.name.clone(),
        }))
    }
}

#[async_trait]
impl DeviceSession for FakeSession {
    async fn list_users(&self) -> Result<Vec<DeviceUser>, DeviceError> {
        Ok(self.fleet.users(&self.device))
    }

    async fn delete_user(&self, id: &str) -> Result<(), DeviceError> {
        let mut stores = self.fleet.stores.lock().unwrap();
        let users = stores.entry(self.device.clone()).or_default();
        users.retain(|u| u.id() != id);
        Ok(())
    }

    async fn add_user<'a>(&self, user: NewDeviceUser<'a>) -> Result<(), DeviceError> {
        let mut stores = self.fleet.stores.lock().unwrap();
        stores
            .entry(self.device.clone())
            .or_default()
            .push(DeviceUser::new(vec![
                DeviceField::new("id", user.user_id),
                DeviceField::new("name", user.display_name),
                DeviceField::new("mailaddress", user.email),
            ]));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

fn record(mail: &str, given: &str, surname: &str) -> DirectoryRecord {
    DirectoryRecord {
        mail: Some(mail.to_string()),
        given_name: Some(given.to_string()),
        surname: Some(surname.to_string()),
    }
}

fn stored_user(id: &str, name: &str, mail: &str) -> DeviceUser {
    DeviceUser::new(vec![
        DeviceField::new("id", id),
        DeviceField::new("name", name),
        DeviceField::new("mailaddress", mail),
    ])
}

fn connection(name: &str) -> DeviceConnection {
    DeviceConnection {
        name: name.to_string(),
        address: format!("https://{name}.example.org"),
        username: "admin".to_string(),
        password: "secret".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn reconciliation_writes_expected_audit_files() {
    // Directory knows Bob and Zoe; the lobby printer holds Bob and a ghost.
    let snapshot = build_snapshot(
        &[
            record("bob@x.org", "Bob", "Smith"),
            record("zoe@x.org", "Zoe", "Zhang"),
        ],
        &[],
    );

    let fleet = FakeFleet::default();
    fleet.seed(
        "lobby",
        vec![
            stored_user("BobS", "Bob S", "bob@x.org"),
            stored_user("GhostG", "Ghost G", "ghost@x.org"),
        ],
    );

    let mut audit = AuditWriter::new(Vec::new(), Vec::new()).unwrap();
    let devices = [connection("lobby")];
    let report = synchronise(
        &fleet,
        &devices,
        &snapshot,
        &mut audit,
        &SyncOptions::default(),
    )
    .await
    .expect("sync run should succeed");

    assert_eq!(report.total_removed(), 1);
    assert_eq!(report.total_added(), 1);

    let (additions, removals) = audit.into_inner();
    assert_eq!(
        String::from_utf8(additions).unwrap(),
        "UserID,Name,Display,EMail,Printer\n\
         \"ZoeZ\",\"Zoe Zhang\",\"Zoe Z\",\"zoe@x.org\",\"lobby\"\n"
    );
    assert_eq!(
        String::from_utf8(removals).unwrap(),
        "id,name,mailaddress,printer\n\
         GhostG,Ghost G,ghost@x.org,lobby\n"
    );

    // The device now holds exactly the directory users.
    let mails: Vec<String> = fleet
        .users("lobby")
        .iter()
        .map(|u| u.mail_address().to_string())
        .collect();
    assert_eq!(mails, vec!["bob@x.org", "zoe@x.org"]);
}

#[tokio::test]
#[serial]
async fn second_run_against_unchanged_state_is_a_no_op() {
    let snapshot = build_snapshot(
        &[
            record("bob@x.org", "Bob", "Smith"),
            record("zoe@x.org", "Zoe", "Zhang"),
        ],
        &[],
    );

    let fleet = FakeFleet::default();
    fleet.seed("lobby", vec![stored_user("BobS", "Bob S", "bob@x.org")]);
    fleet.seed("annex", vec![]);

    let devices = [connection("lobby"), connection("annex")];

    let mut first_audit = AuditWriter::new(Vec::new(), Vec::new()).unwrap();
    let first = synchronise(
        &fleet,
        &devices,
        &snapshot,
        &mut first_audit,
        &SyncOptions::default(),
    )
    .await
    .unwrap();
    assert!(first.total_added() > 0);

    let mut second_audit = AuditWriter::new(Vec::new(), Vec::new()).unwrap();
    let second = synchronise(
        &fleet,
        &devices,
        &snapshot,
        &mut second_audit,
        &SyncOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(second.total_added(), 0, "second run must add nothing");
    assert_eq!(second.total_removed(), 0, "second run must remove nothing");

    let (additions, removals) = second_audit.into_inner();
    assert_eq!(
        String::from_utf8(additions).unwrap(),
        "UserID,Name,Display,EMail,Printer\n"
    );
    assert_eq!(
        String::from_utf8(removals).unwrap(),
        "id,name,mailaddress,printer\n"
    );
}

#[tokio::test]
#[serial]
async fn removal_header_comes_from_first_device_with_users() {
    let snapshot = build_snapshot(&[record("bob@x.org", "Bob", "Smith")], &[]);

    let fleet = FakeFleet::default();
    // First configured device is empty: it must not capture the schema.
    fleet.seed("empty", vec![]);
    fleet.seed(
        "lobby",
        vec![DeviceUser::new(vec![
            DeviceField::new("id", "BobS"),
            DeviceField::new("name", "Bob S"),
            DeviceField::new("mailaddress", "bob@x.org"),
            DeviceField::new("faxnumber", ""),
        ])],
    );

    let mut audit = AuditWriter::new(Vec::new(), Vec::new()).unwrap();
    let devices = [connection("empty"), connection("lobby")];
    synchronise(
        &fleet,
        &devices,
        &snapshot,
        &mut audit,
        &SyncOptions::default(),
    )
    .await
    .unwrap();

    let (_, removals) = audit.into_inner();
    assert_eq!(
        String::from_utf8(removals).unwrap(),
        "id,name,mailaddress,faxnumber,printer\n"
    );
}

//! Audit-trail output: one log of additions, one log of removals.
//!
//! Both logs are CSV-like and append-style, written through handles the
//! caller opens once for the whole run. The addition log has a fixed schema
//! and gets its header at construction. The removal log's schema is not
//! known up front: it is discovered from the first device user seen in the
//! run (see [`FieldSchema`]) and its header is written exactly once, at that
//! moment. Devices with no users never trigger discovery.

use std::io::{self, Write};

use crate::contract::DeviceUser;
use crate::snapshot::DirectoryUser;

/// Header of the addition log. Fixed, unlike the removal schema.
pub const ADDITION_HEADER: &str = "UserID,Name,Display,EMail,Printer";

/// Column appended to the discovered schema in the removal log.
pub const PRINTER_COLUMN: &str = "printer";

/// The field schema discovered from the first device user of a run.
///
/// Captured once and reused for every subsequent device; a later device
/// exposing a different field set does not replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<String>,
}

impl FieldSchema {
    pub fn from_user(user: &DeviceUser) -> Self {
        Self {
            fields: user.field_names().map(str::to_string).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether a device user exposes exactly this schema's field names, in
    /// order.
    pub fn matches(&self, user: &DeviceUser) -> bool {
        self.fields.iter().map(String::as_str).eq(user.field_names())
    }
}

/// Writer for the two audit logs.
pub struct AuditWriter<W: Write> {
    additions: W,
    removals: W,
    removal_header_written: bool,
}

impl<W: Write> AuditWriter<W> {
    /// Wrap the two log sinks. The addition header is written immediately;
    /// the removal header waits for schema discovery.
    pub fn new(mut additions: W, removals: W) -> io::Result<Self> {
        writeln!(additions, "{ADDITION_HEADER}")?;
        Ok(Self {
            additions,
            removals,
            removal_header_written: false,
        })
    }

    /// Write the removal-log header from the discovered schema. Later calls
    /// are no-ops: the schema is fixed for the whole run once captured.
    pub fn write_removal_header(&mut self, schema: &FieldSchema) -> io::Result<()> {
        if self.removal_header_written {
            return Ok(());
        }
        writeln!(
            self.removals,
            "{},{PRINTER_COLUMN}",
            schema.fields().join(",")
        )?;
        self.removal_header_written = true;
        Ok(())
    }

    /// Append one addition line: quoted, comma-joined, fixed field order,
    /// device name last.
    pub fn append_addition(&mut self, user: &DirectoryUser, printer: &str) -> io::Result<()> {
        writeln!(
            self.additions,
            "\"{}\",\"{}\",\"{}\",\"{}\",\"{}\"",
            user.id, user.full_name, user.display_name, user.mail, printer
        )
    }

    /// Append one removal line: the user's own field values in schema order,
    /// then the device name.
    pub fn append_removal(&mut self, user: &DeviceUser, printer: &str) -> io::Result<()> {
        let values: Vec<&str> = user.field_values().collect();
        writeln!(self.removals, "{},{printer}", values.join(","))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.additions.flush()?;
        self.removals.flush()
    }

    /// Consume the writer and hand back the two underlying sinks.
    pub fn into_inner(self) -> (W, W) {
        (self.additions, self.removals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::DeviceField;

    fn device_user() -> DeviceUser {
        DeviceUser::new(vec![
            DeviceField::new("id", "GhostG"),
            DeviceField::new("name", "Ghost G"),
            DeviceField::new("mailaddress", "ghost@x.com"),
        ])
    }

    fn directory_user() -> DirectoryUser {
        DirectoryUser {
            id: "JohnD".to_string(),
            full_name: "John Doe".to_string(),
            display_name: "John D".to_string(),
            mail: "jd@x.com".to_string(),
            tag: 6,
        }
    }

    #[test]
    fn addition_header_is_written_up_front() {
        let writer = AuditWriter::new(Vec::new(), Vec::new()).unwrap();
        assert_eq!(
            String::from_utf8(writer.additions).unwrap(),
            "UserID,Name,Display,EMail,Printer\n"
        );
    }

    #[test]
    fn addition_lines_are_quoted_in_fixed_order() {
        let mut writer = AuditWriter::new(Vec::new(), Vec::new()).unwrap();
        writer.append_addition(&directory_user(), "lobby").unwrap();
        let out = String::from_utf8(writer.additions).unwrap();
        assert!(out.ends_with("\"JohnD\",\"John Doe\",\"John D\",\"jd@x.com\",\"lobby\"\n"));
    }

    #[test]
    fn removal_header_uses_discovered_schema_and_is_written_once() {
        let mut writer = AuditWriter::new(Vec::new(), Vec::new()).unwrap();
        let schema = FieldSchema::from_user(&device_user());
        writer.write_removal_header(&schema).unwrap();
        writer.write_removal_header(&schema).unwrap();
        assert_eq!(
            String::from_utf8(writer.removals).unwrap(),
            "id,name,mailaddress,printer\n"
        );
    }

    #[test]
    fn removal_lines_join_field_values_and_append_printer() {
        let mut writer = AuditWriter::new(Vec::new(), Vec::new()).unwrap();
        let user = device_user();
        writer
            .write_removal_header(&FieldSchema::from_user(&user))
            .unwrap();
        writer.append_removal(&user, "lobby").unwrap();
        let out = String::from_utf8(writer.removals).unwrap();
        assert_eq!(
            out,
            "id,name,mailaddress,printer\nGhostG,Ghost G,ghost@x.com,lobby\n"
        );
    }

    #[test]
    fn schema_match_requires_same_names_in_order() {
        let schema = FieldSchema::from_user(&device_user());
        assert!(schema.matches(&device_user()));
        let reordered = DeviceUser::new(vec![
            DeviceField::new("name", "A"),
            DeviceField::new("id", "B"),
            DeviceField::new("mailaddress", "c@d.e"),
        ]);
        assert!(!schema.matches(&reordered));
    }
}

//! Display grouping tags.
//!
//! Some printers group address-book entries under a small integer tag
//! derived from the first letter of the user's given name. The table is
//! fixed device firmware behavior, not a tunable.

use crate::error::SyncError;

/// Map a given name to its display grouping tag.
///
/// The first character decides the group; lowercase letters classify as
/// their uppercase equivalent. Empty names and names starting with anything
/// outside A-Z are rejected.
pub fn tag_index(name: &str) -> Result<u8, SyncError> {
    let first = name
        .chars()
        .next()
        .ok_or_else(|| SyncError::InvalidInput("empty name has no tag".to_string()))?;

    match first.to_ascii_uppercase() {
        'A' | 'B' => Ok(2),
        'C' | 'D' => Ok(3),
        'E' | 'F' => Ok(4),
        'G' | 'H' => Ok(5),
        'I' | 'J' | 'K' => Ok(6),
        'L' | 'M' | 'N' => Ok(7),
        'O' | 'P' | 'Q' => Ok(8),
        'R' | 'S' | 'T' => Ok(9),
        'U' | 'V' | 'W' => Ok(10),
        'X' | 'Y' | 'Z' => Ok(11),
        other => Err(SyncError::InvalidInput(format!(
            "name starts with untaggable character {other:?}"
        ))),
    }
}

//! Keyed archive (`NSKeyedArchiver`) decoder.
//!
//! A keyed archive is a binary property list whose root dictionary holds a
//! flat `$objects` table; everything else in the archive points into that
//! table by index. Parsing of the property list itself is delegated to the
//! `plist` crate and converted into [`ArchiveValue`]s.

use std::io::Cursor;
use std::time::SystemTime;

use super::{ArchiveError, ArchiveResult, ArchiveValue};

const BPLIST_MAGIC: &[u8] = b"bplist00";

/// A decoded keyed archive.
#[derive(Debug, Clone)]
pub struct KeyedArchive {
    root: ArchiveValue,
}

impl KeyedArchive {
    /// The `$objects` table, in archive order.
    pub fn objects(&self) -> &[ArchiveValue] {
        // Checked in `decode`
        self.root
            .get("$objects")
            .and_then(ArchiveValue::as_array)
            .unwrap_or(&[])
    }
}

/// Decode a binary property list keyed archive.
pub fn decode(bytes: &[u8]) -> ArchiveResult<KeyedArchive> {
    if !bytes.starts_with(BPLIST_MAGIC) {
        return Err(ArchiveError::NotBinaryPlist);
    }

    let value = plist::Value::from_reader(Cursor::new(bytes))?;
    let root = convert(value);

    match root.get("$objects") {
        Some(ArchiveValue::Array(_)) => Ok(KeyedArchive { root }),
        Some(other) => Err(ArchiveError::MissingObjects(other.kind())),
        None => Err(ArchiveError::MissingObjects(root.kind())),
    }
}

fn convert(value: plist::Value) -> ArchiveValue {
    match value {
        plist::Value::Array(items) => ArchiveValue::Array(items.into_iter().map(convert).collect()),
        plist::Value::Dictionary(dict) => {
            let entries = dict.into_iter().map(|(k, v)| (k, convert(v))).collect();
            ArchiveValue::Dictionary(entries)
        }
        plist::Value::Boolean(b) => ArchiveValue::Boolean(b),
        plist::Value::Data(d) => ArchiveValue::Data(d),
        plist::Value::Date(d) => ArchiveValue::Date(SystemTime::from(d)),
        plist::Value::Real(r) => ArchiveValue::Real(r),
        plist::Value::Integer(i) => match i.as_signed() {
            Some(n) => ArchiveValue::Integer(n),
            None => i
                .as_unsigned()
                .map(|n| ArchiveValue::Real(n as f64))
                .unwrap_or(ArchiveValue::Null),
        },
        plist::Value::String(s) => ArchiveValue::String(s),
        plist::Value::Uid(uid) => ArchiveValue::Uid(uid.get()),
        _ => ArchiveValue::Null,
    }
}

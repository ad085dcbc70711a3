//! Decoders for the binary object archives embedded in message rows.
//!
//! Two legacy formats show up in a message export:
//!
//! - the **typed stream** (`NSArchiver`), a linear stream of typed values that
//!   carries the rich-text body of a message, see [`typedstream`];
//! - the **keyed archive** (`NSKeyedArchiver`), a binary property list whose
//!   root holds a flat `$objects` table, carrying interactive payloads, see
//!   [`keyed`].
//!
//! Both decoders produce [`ArchiveValue`]s so that callers only ever deal with
//! one value model.

pub mod keyed;
pub mod typedstream;

use std::time::SystemTime;

pub use keyed::KeyedArchive;

/// A primitive value decoded from either archive format.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
    /// Raw byte string
    Data(Vec<u8>),
    Date(SystemTime),
    /// Index into the archive's object table
    Uid(u64),
    Array(Vec<ArchiveValue>),
    /// Key/value pairs in archive order
    Dictionary(Vec<(String, ArchiveValue)>),
}

impl ArchiveValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArchiveValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            ArchiveValue::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ArchiveValue]> {
        match self {
            ArchiveValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key in a dictionary value.
    pub fn get(&self, key: &str) -> Option<&ArchiveValue> {
        match self {
            ArchiveValue::Dictionary(entries) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ArchiveValue::Null => "null",
            ArchiveValue::Boolean(_) => "boolean",
            ArchiveValue::Integer(_) => "integer",
            ArchiveValue::Real(_) => "real",
            ArchiveValue::String(_) => "string",
            ArchiveValue::Data(_) => "data",
            ArchiveValue::Date(_) => "date",
            ArchiveValue::Uid(_) => "uid",
            ArchiveValue::Array(_) => "array",
            ArchiveValue::Dictionary(_) => "dictionary",
        }
    }
}

/// Errors raised when bytes do not conform to the expected archive format.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Unexpected end of archive at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("Invalid typed stream header: {0}")]
    BadHeader(String),

    #[error("Unexpected tag 0x{tag:02x} at offset {offset}")]
    UnexpectedTag { tag: u8, offset: usize },

    #[error("Unsupported type encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("Reference {index} does not point at a known {table} entry")]
    InvalidReference { table: &'static str, index: i64 },

    #[error("Archive contains no byte string")]
    MissingByteString,

    #[error("Byte string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Not a binary property list")]
    NotBinaryPlist,

    #[error("Failed to parse property list: {0}")]
    Plist(#[from] plist::Error),

    #[error("Keyed archive root must be a dictionary with an $objects array, found {0}")]
    MissingObjects(&'static str),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

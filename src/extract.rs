//! Content token extraction from keyed archive object tables.
//!
//! Interactive payloads store their visible text (captions, app identifiers,
//! result lines) as plain strings in the `$objects` table, mixed with
//! structural keys and inline images. Extraction keeps the former in table
//! order, since later heuristics rely on that order.

use crate::archive::{keyed, ArchiveResult, ArchiveValue};

/// Structural entries that never carry message content.
pub const DENYLIST: &[&str] = &[
    "$null",
    "ldtext",
    "userInfo",
    "an",
    "ai",
    "appid",
    "sessionIdentifier",
    "liveLayoutInfo",
    "layoutClass",
    "URL",
    "image-subtitle",
    "image-title",
    "caption",
    "secondary-subcaption",
    "tertiary-subcaption",
    "subcaption",
    "",
    SUITE_MARKER,
];

/// Name of the game suite, present in every payload.
pub const SUITE_MARKER: &str = "GamePigeon";

const DATA_URI_PREFIX: &str = "data:";

/// Filter an object table down to its content tokens, preserving order.
pub fn content_tokens(objects: &[ArchiveValue]) -> Vec<String> {
    objects
        .iter()
        .filter_map(ArchiveValue::as_str)
        .filter(|s| is_content(s))
        .map(str::to_string)
        .collect()
}

/// Decode a raw keyed archive payload and extract its content tokens.
pub fn payload_tokens(bytes: &[u8]) -> ArchiveResult<Vec<String>> {
    let archive = keyed::decode(bytes)?;
    Ok(content_tokens(archive.objects()))
}

fn is_content(s: &str) -> bool {
    !DENYLIST.contains(&s) && !s.starts_with(DATA_URI_PREFIX)
}

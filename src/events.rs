//! Message rows of an archive export.
//!
//! The export is JSON lines, one message per line. Binary columns are base64
//! strings; `is_from_me` may be a boolean or the 0/1 integer of the source
//! database.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One message of the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessageEvent {
    #[serde(default)]
    pub message_id: i64,
    /// Shared by all messages of one interactive exchange
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub handle_id: i64,
    #[serde(deserialize_with = "bool_or_int")]
    pub is_from_me: bool,
    pub timestamp: i64,
    #[serde(default)]
    pub text: Option<String>,
    /// Typed stream rich-text body
    #[serde(
        default,
        with = "base64_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub attributed_body: Option<Vec<u8>>,
    /// Keyed archive interactive payload
    #[serde(
        default,
        with = "base64_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload_data: Option<Vec<u8>>,
}

/// Load message rows from a JSON-lines file.
pub fn load_events<P: AsRef<Path>>(path: P) -> Result<Vec<RawMessageEvent>> {
    let path = path.as_ref();
    let file = fs::File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    parse_events(BufReader::new(file)).with_context(|| format!("Failed to read {:?}", path))
}

/// Parse message rows from a JSON-lines reader, skipping blank lines.
pub fn parse_events<R: BufRead>(reader: R) -> Result<Vec<RawMessageEvent>> {
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.with_context(|| format!("Failed to read line {}", line_num + 1))?;

        if line.trim().is_empty() {
            continue;
        }

        let event: RawMessageEvent = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse message on line {}", line_num + 1))?;
        events.push(event);
    }

    Ok(events)
}

fn bool_or_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Error::custom(format!("expected 0 or 1, got {n}"))),
        },
        other => Err(Error::custom(format!("expected boolean, got {other}"))),
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let value: Option<String> = Option::deserialize(deserializer)?;
        value
            .map(|s| STANDARD.decode(s.trim()).map_err(Error::custom))
            .transpose()
    }
}

//! Rich-text body extraction.
//!
//! Messages composed with formatting store their text only inside the
//! `attributedBody` typed stream. Decoding it yields one [`BodyRecord`] per
//! message, and fills in the text of rows whose plain text column is empty.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::archive::{typedstream, ArchiveError};
use crate::events::RawMessageEvent;
use crate::session::FailurePolicy;
use crate::store::Keyed;

/// Decoded rich-text body of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRecord {
    pub message_id: i64,
    pub text: String,
}

impl Keyed for BodyRecord {
    fn key(&self) -> String {
        self.message_id.to_string()
    }
}

/// Result of decoding the bodies of one batch.
#[derive(Debug, Default)]
pub struct BodyReport {
    pub records: Vec<BodyRecord>,
    /// Message ids whose body failed to decode (skip policy only)
    pub failed: Vec<i64>,
}

#[derive(Debug, thiserror::Error)]
#[error("Message {message_id}: {source}")]
pub struct BodyError {
    pub message_id: i64,
    pub source: ArchiveError,
}

/// The text of a message: its plain text, or else its decoded rich-text body.
///
/// A row with neither has no text; that is not an error.
pub fn resolve_text(event: &RawMessageEvent) -> Result<Option<String>, ArchiveError> {
    if let Some(text) = &event.text {
        return Ok(Some(text.clone()));
    }
    event
        .attributed_body
        .as_deref()
        .map(typedstream::decode_text)
        .transpose()
}

/// Decode the rich-text body of every message that has one.
pub fn extract_bodies(
    events: &[RawMessageEvent],
    policy: FailurePolicy,
) -> Result<BodyReport, BodyError> {
    let mut report = BodyReport::default();

    for event in events {
        let Some(bytes) = event.attributed_body.as_deref() else {
            continue;
        };

        match typedstream::decode_text(bytes) {
            Ok(text) => report.records.push(BodyRecord {
                message_id: event.message_id,
                text,
            }),
            Err(source) => {
                let err = BodyError {
                    message_id: event.message_id,
                    source,
                };
                match policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Skip => {
                        warn!("Skipping body: {}", err);
                        report.failed.push(event.message_id);
                    }
                }
            }
        }
    }

    let (decoded, failed) = (report.records.len(), report.failed.len());
    debug!(decoded, failed, "Extracted message bodies");
    Ok(report)
}

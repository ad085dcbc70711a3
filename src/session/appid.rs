//! Application identifier resolution.

use std::collections::{BTreeSet, HashSet};

use super::{SessionError, SessionEvent};

/// Prefix of the invitation message sent when a game starts.
pub const DEFAULT_INVITE_PREFIX: &str = "Let's play ";

/// Find the single known application identifier mentioned by a group.
///
/// Candidates are every event's text and content tokens with the invitation
/// prefix removed. Zero or several distinct known identifiers is an error.
pub fn resolve_app_id(
    correlation_id: &str,
    events: &[SessionEvent],
    known: &HashSet<String>,
    invite_prefix: &str,
) -> Result<String, SessionError> {
    let found: BTreeSet<&str> = events
        .iter()
        .flat_map(SessionEvent::candidates)
        .map(|c| strip_invite(c, invite_prefix))
        .filter(|c| known.contains(*c))
        .collect();

    let mut found = found.into_iter();
    match (found.next(), found.next()) {
        (Some(app_id), None) => Ok(app_id.to_string()),
        (first, second) => Err(SessionError::AmbiguousApplicationId {
            correlation_id: correlation_id.to_string(),
            candidates: first
                .into_iter()
                .chain(second)
                .chain(found)
                .map(str::to_string)
                .collect(),
        }),
    }
}

fn strip_invite<'a>(candidate: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return candidate;
    }
    candidate.strip_prefix(prefix).unwrap_or(candidate)
}

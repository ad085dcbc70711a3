//! Batch orchestration: grouping, per-group resolution and failure policy.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::appid::{resolve_app_id, DEFAULT_INVITE_PREFIX};
use super::outcome::{phrase_outcome, reconcile, win_signals};
use super::points::{points_signals, resolve_scores};
use super::{FailurePolicy, GameSession, SessionError};
use crate::archive::ArchiveError;
use crate::bodies::resolve_text;
use crate::events::RawMessageEvent;
use crate::extract::payload_tokens;
use crate::registry::{AppRegistry, RegistryError};

/// A group member with its binary payloads decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub message_id: i64,
    pub handle_id: i64,
    pub is_from_me: bool,
    pub timestamp: i64,
    /// Plain text, or the decoded rich-text body when the row has none
    pub text: Option<String>,
    /// Content tokens of the interactive payload
    pub tokens: Vec<String>,
}

impl SessionEvent {
    /// Decode the payloads of a raw message row.
    pub fn decode(raw: &RawMessageEvent) -> Result<Self, ArchiveError> {
        let text = resolve_text(raw)?;
        let tokens = match &raw.payload_data {
            Some(bytes) => payload_tokens(bytes)?,
            None => Vec::new(),
        };

        Ok(Self {
            message_id: raw.message_id,
            handle_id: raw.handle_id,
            is_from_me: raw.is_from_me,
            timestamp: raw.timestamp,
            text,
            tokens,
        })
    }

    /// Text first, then content tokens in payload order.
    pub fn candidates(&self) -> impl Iterator<Item = &str> + '_ {
        self.text
            .as_deref()
            .into_iter()
            .chain(self.tokens.iter().map(String::as_str))
    }
}

/// Options controlling a reconstruction run.
#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    pub policy: FailurePolicy,
    /// Evaluate groups on the rayon thread pool
    pub parallel: bool,
    pub invite_prefix: String,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::Abort,
            parallel: true,
            invite_prefix: DEFAULT_INVITE_PREFIX.to_string(),
        }
    }
}

/// Result of reconstructing one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Sessions in ascending correlation-id order
    pub sessions: Vec<GameSession>,
    /// Groups that failed; only populated under [`FailurePolicy::Skip`]
    pub failures: Vec<SessionError>,
    /// Events without a correlation id
    pub excluded: usize,
}

/// Group events by correlation id, ordered by id.
///
/// Returns the groups and the number of events left out for lacking an id.
pub fn group_events(
    events: &[RawMessageEvent],
) -> (BTreeMap<&str, Vec<&RawMessageEvent>>, usize) {
    let mut groups: BTreeMap<&str, Vec<&RawMessageEvent>> = BTreeMap::new();
    let mut excluded = 0;

    for event in events {
        match event.correlation_id.as_deref() {
            Some(id) => groups.entry(id).or_default().push(event),
            None => excluded += 1,
        }
    }

    (groups, excluded)
}

/// Turns message batches into game sessions.
pub struct Reconstructor {
    known_app_ids: HashSet<String>,
    options: ReconstructOptions,
}

impl Reconstructor {
    /// Query the registry once and keep its identifiers for every group.
    pub fn new(
        registry: &dyn AppRegistry,
        options: ReconstructOptions,
    ) -> Result<Self, RegistryError> {
        let ids = registry.known_app_ids()?;
        debug!(count = ids.len(), "Loaded known application ids");
        Ok(Self::with_known_ids(ids, options))
    }

    pub fn with_known_ids(
        ids: impl IntoIterator<Item = String>,
        options: ReconstructOptions,
    ) -> Self {
        Self {
            known_app_ids: ids.into_iter().collect(),
            options,
        }
    }

    /// Reconstruct every session of a batch.
    ///
    /// Under [`FailurePolicy::Abort`] the error of the failing group with the
    /// lowest correlation id is returned, whatever the evaluation order.
    pub fn run(&self, events: &[RawMessageEvent]) -> Result<BatchReport, SessionError> {
        let (groups, excluded) = group_events(events);
        let groups: Vec<(&str, Vec<&RawMessageEvent>)> = groups.into_iter().collect();
        debug!(groups = groups.len(), excluded, "Grouped events");

        let results: Vec<Result<GameSession, SessionError>> = if self.options.parallel {
            groups
                .par_iter()
                .map(|(id, members)| self.resolve_group(id, members))
                .collect()
        } else {
            groups
                .iter()
                .map(|(id, members)| self.resolve_group(id, members))
                .collect()
        };

        let mut report = BatchReport {
            excluded,
            ..Default::default()
        };
        for result in results {
            match result {
                Ok(session) => report.sessions.push(session),
                Err(err) => match self.options.policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Skip => {
                        let correlation_id = err.correlation_id();
                        warn!(correlation_id, "Skipping session: {}", err);
                        report.failures.push(err);
                    }
                },
            }
        }

        let (sessions, failures) = (report.sessions.len(), report.failures.len());
        info!(sessions, failures, excluded, "Reconstructed sessions");
        Ok(report)
    }

    /// Resolve one correlation-id group into a session.
    pub fn resolve_group(
        &self,
        correlation_id: &str,
        members: &[&RawMessageEvent],
    ) -> Result<GameSession, SessionError> {
        let mut events = members
            .iter()
            .map(|raw| {
                SessionEvent::decode(raw).map_err(|source| SessionError::MalformedArchive {
                    correlation_id: correlation_id.to_string(),
                    message_id: raw.message_id,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        events.sort_by_key(|e| (e.timestamp, e.message_id));

        self.resolve_events(correlation_id, &events)
    }

    /// Resolve already decoded, timestamp-ordered group members.
    pub fn resolve_events(
        &self,
        correlation_id: &str,
        events: &[SessionEvent],
    ) -> Result<GameSession, SessionError> {
        let (first, last) = match (events.first(), events.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(SessionError::AmbiguousApplicationId {
                    correlation_id: correlation_id.to_string(),
                    candidates: Vec::new(),
                })
            }
        };

        let application_id = resolve_app_id(
            correlation_id,
            events,
            &self.known_app_ids,
            &self.options.invite_prefix,
        )?;

        let signals = win_signals(correlation_id, events)?;
        let phrase = phrase_outcome(correlation_id, &signals)?;

        let points = points_signals(correlation_id, events)?;
        let scores = resolve_scores(correlation_id, &points)?;

        let outcome = reconcile(correlation_id, phrase, &scores)?;
        debug!(
            correlation_id,
            %application_id,
            %outcome,
            "Resolved session"
        );

        Ok(GameSession {
            correlation_id: correlation_id.to_string(),
            application_id,
            start_timestamp: first.timestamp,
            end_timestamp: last.timestamp,
            opponent_handle_id: first.handle_id,
            outcome,
            own_score: scores.own,
            opponent_score: scores.opponent,
        })
    }
}

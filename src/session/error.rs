//! Session reconstruction errors.

use std::num::ParseIntError;

use super::TerminationOutcome;
use crate::archive::ArchiveError;

/// A group of messages the heuristics cannot turn into a session.
///
/// Every variant carries the correlation id of the group and the evidence
/// that tripped the check.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {correlation_id}: message {message_id} has a malformed archive: {source}")]
    MalformedArchive {
        correlation_id: String,
        message_id: i64,
        source: ArchiveError,
    },

    #[error(
        "Session {correlation_id}: expected exactly one known application id, found {candidates:?}"
    )]
    AmbiguousApplicationId {
        correlation_id: String,
        candidates: Vec<String>,
    },

    #[error("Session {correlation_id}: message {message_id} has several win signals {phrases:?}")]
    TooManyWinSignals {
        correlation_id: String,
        message_id: i64,
        phrases: Vec<String>,
    },

    #[error("Session {correlation_id}: too many points signals ({detail})")]
    TooManyPointsSignals {
        correlation_id: String,
        detail: String,
    },

    #[error("Session {correlation_id}: points signal {phrase:?} has no readable score: {source}")]
    UnreadablePointsSignal {
        correlation_id: String,
        phrase: String,
        source: ParseIntError,
    },

    #[error("Session {correlation_id}: unknown outcome phrases {phrases:?}")]
    UnknownOutcomePhrase {
        correlation_id: String,
        phrases: Vec<String>,
    },

    #[error(
        "Session {correlation_id}: text says {textual} but scores {own_score}-{opponent_score} say {numeric}"
    )]
    InconsistentOutcome {
        correlation_id: String,
        textual: TerminationOutcome,
        numeric: TerminationOutcome,
        own_score: i64,
        opponent_score: i64,
    },
}

impl SessionError {
    /// Correlation id of the group that failed.
    pub fn correlation_id(&self) -> &str {
        match self {
            SessionError::MalformedArchive { correlation_id, .. }
            | SessionError::AmbiguousApplicationId { correlation_id, .. }
            | SessionError::TooManyWinSignals { correlation_id, .. }
            | SessionError::TooManyPointsSignals { correlation_id, .. }
            | SessionError::UnreadablePointsSignal { correlation_id, .. }
            | SessionError::UnknownOutcomePhrase { correlation_id, .. }
            | SessionError::InconsistentOutcome { correlation_id, .. } => correlation_id,
        }
    }
}

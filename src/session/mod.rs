//! Game session reconstruction.
//!
//! Messages exchanged while playing an interactive game share a correlation
//! id but arrive as loose, noisy rows: invitations, moves, result banners and
//! score lines. This module groups them back into one [`GameSession`] per
//! correlation id.
//!
//! Each group is resolved on its own:
//!
//! 1. [`appid`] finds the single known application identifier;
//! 2. [`outcome`] derives a provisional outcome from win/draw phrases;
//! 3. [`points`] extracts per-side scores;
//! 4. [`outcome::reconcile`] lets numeric evidence override ambiguous text and
//!    rejects contradictions.
//!
//! Every heuristic that meets an input shape it does not model fails with a
//! [`SessionError`]; what happens to the rest of the batch is decided by the
//! [`FailurePolicy`].

pub mod appid;
mod error;
pub mod outcome;
pub mod points;
mod reconstruct;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::SessionError;
pub use reconstruct::{group_events, BatchReport, ReconstructOptions, Reconstructor, SessionEvent};

/// Final result of one game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationOutcome {
    Won,
    Lost,
    Draw,
    Unknown,
}

impl TerminationOutcome {
    /// Numeric code used by the output record.
    pub fn code(&self) -> u8 {
        match self {
            TerminationOutcome::Won => 1,
            TerminationOutcome::Lost => 2,
            TerminationOutcome::Draw => 3,
            TerminationOutcome::Unknown => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TerminationOutcome::Won),
            2 => Some(TerminationOutcome::Lost),
            3 => Some(TerminationOutcome::Draw),
            4 => Some(TerminationOutcome::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationOutcome::Won => "won",
            TerminationOutcome::Lost => "lost",
            TerminationOutcome::Draw => "draw",
            TerminationOutcome::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// One reconstructed game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    pub correlation_id: String,
    pub application_id: String,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub opponent_handle_id: i64,
    pub outcome: TerminationOutcome,
    pub own_score: Option<i64>,
    pub opponent_score: Option<i64>,
}

/// What to do with the rest of a batch when one group fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole batch at the first failing group
    #[default]
    Abort,
    /// Log and record the failing group, keep going with the others
    Skip,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Skip => write!(f, "skip"),
        }
    }
}

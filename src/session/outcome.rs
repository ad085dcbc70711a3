//! Outcome resolution from win/draw phrases, and reconciliation with scores.
//!
//! Games announce their result with a banner such as "I won!" from the
//! winner's side or "You won!" from the loser's side. The meaning of a banner
//! depends on who sent the message carrying it.

use super::points::Scores;
use super::{SessionError, SessionEvent, TerminationOutcome};

/// Substrings marking a phrase as a win/draw announcement (lower-cased).
pub const WIN_MARKERS: &[&str] = &[" won", "draw"];

pub const DRAW_PHRASE: &str = "draw!";
pub const I_WON_PHRASE: &str = "i won!";
pub const YOU_WON_PHRASE: &str = "you won!";

/// A win/draw phrase and the side that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinSignal {
    /// Lower-cased phrase
    pub phrase: String,
    pub from_me: bool,
}

/// Outcome derived from phrases alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseOutcome {
    pub outcome: TerminationOutcome,
    /// Number of distinct phrases the outcome was derived from
    pub distinct_phrases: usize,
}

impl PhraseOutcome {
    /// Numeric evidence may override this outcome without a conflict.
    pub fn is_overridable(&self) -> bool {
        self.outcome == TerminationOutcome::Unknown || self.distinct_phrases > 1
    }
}

/// Collect the distinct win signals of a group.
///
/// Events must be in ascending timestamp order: a phrase repeated by several
/// events is attributed to the earliest one.
pub fn win_signals(
    correlation_id: &str,
    events: &[SessionEvent],
) -> Result<Vec<WinSignal>, SessionError> {
    let mut signals: Vec<WinSignal> = Vec::new();

    for event in events {
        let phrases: Vec<String> = event
            .candidates()
            .map(str::to_lowercase)
            .filter(|p| WIN_MARKERS.iter().any(|m| p.contains(m)))
            .collect();

        if phrases.len() > 1 {
            return Err(SessionError::TooManyWinSignals {
                correlation_id: correlation_id.to_string(),
                message_id: event.message_id,
                phrases,
            });
        }

        if let Some(phrase) = phrases.into_iter().next() {
            if !signals.iter().any(|s| s.phrase == phrase) {
                signals.push(WinSignal {
                    phrase,
                    from_me: event.is_from_me,
                });
            }
        }
    }

    Ok(signals)
}

/// Derive the provisional outcome from the distinct win signals of a group.
pub fn phrase_outcome(
    correlation_id: &str,
    signals: &[WinSignal],
) -> Result<PhraseOutcome, SessionError> {
    let unknown_phrases = || SessionError::UnknownOutcomePhrase {
        correlation_id: correlation_id.to_string(),
        phrases: signals.iter().map(|s| s.phrase.clone()).collect(),
    };

    let outcome = match signals {
        [] => TerminationOutcome::Unknown,
        [only] => match only.phrase.as_str() {
            DRAW_PHRASE => TerminationOutcome::Draw,
            I_WON_PHRASE => winner(only.from_me),
            YOU_WON_PHRASE => winner(!only.from_me),
            _ => return Err(unknown_phrases()),
        },
        [a, b] => {
            let i_won = [a, b]
                .into_iter()
                .find(|s| s.phrase == I_WON_PHRASE)
                .ok_or_else(unknown_phrases)?;
            if !signals.iter().any(|s| s.phrase == YOU_WON_PHRASE) {
                return Err(unknown_phrases());
            }
            winner(i_won.from_me)
        }
        _ => return Err(unknown_phrases()),
    };

    Ok(PhraseOutcome {
        outcome,
        distinct_phrases: signals.len(),
    })
}

/// Combine phrase evidence with scores into the final outcome.
///
/// When both scores are known they decide the outcome. A single unambiguous
/// phrase that disagrees with them is an error.
pub fn reconcile(
    correlation_id: &str,
    phrase: PhraseOutcome,
    scores: &Scores,
) -> Result<TerminationOutcome, SessionError> {
    let (own, opponent) = match (scores.own, scores.opponent) {
        (Some(own), Some(opponent)) => (own, opponent),
        _ => return Ok(phrase.outcome),
    };

    let numeric = match own.cmp(&opponent) {
        std::cmp::Ordering::Equal => TerminationOutcome::Draw,
        std::cmp::Ordering::Greater => TerminationOutcome::Won,
        std::cmp::Ordering::Less => TerminationOutcome::Lost,
    };

    if numeric != phrase.outcome && !phrase.is_overridable() {
        return Err(SessionError::InconsistentOutcome {
            correlation_id: correlation_id.to_string(),
            textual: phrase.outcome,
            numeric,
            own_score: own,
            opponent_score: opponent,
        });
    }

    Ok(numeric)
}

fn winner(owner_won: bool) -> TerminationOutcome {
    if owner_won {
        TerminationOutcome::Won
    } else {
        TerminationOutcome::Lost
    }
}

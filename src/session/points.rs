//! Score extraction from points phrases ("10 points").

use std::num::ParseIntError;

use super::{SessionError, SessionEvent};

/// Substring marking a phrase as a score announcement (lower-cased).
pub const POINTS_MARKER: &str = " points";

/// A score announced by one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsSignal {
    pub points: i64,
    pub from_me: bool,
}

/// Per-side scores of a session; a side without a signal stays unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scores {
    pub own: Option<i64>,
    pub opponent: Option<i64>,
}

/// Collect the distinct `(side, points)` signals of a group, in event order.
pub fn points_signals(
    correlation_id: &str,
    events: &[SessionEvent],
) -> Result<Vec<PointsSignal>, SessionError> {
    let mut signals: Vec<PointsSignal> = Vec::new();

    for event in events {
        let mut phrases: Vec<&str> = Vec::new();
        for candidate in event.candidates() {
            if candidate.to_lowercase().contains(POINTS_MARKER) && !phrases.contains(&candidate) {
                phrases.push(candidate);
            }
        }

        if phrases.len() > 1 {
            return Err(SessionError::TooManyPointsSignals {
                correlation_id: correlation_id.to_string(),
                detail: format!("message {} has {:?}", event.message_id, phrases),
            });
        }

        let Some(phrase) = phrases.first() else {
            continue;
        };
        let points = parse_points(phrase).map_err(|source| SessionError::UnreadablePointsSignal {
            correlation_id: correlation_id.to_string(),
            phrase: phrase.to_string(),
            source,
        })?;

        let signal = PointsSignal {
            points,
            from_me: event.is_from_me,
        };
        if !signals.contains(&signal) {
            signals.push(signal);
        }
    }

    Ok(signals)
}

/// Split distinct points signals into own and opponent scores.
pub fn resolve_scores(
    correlation_id: &str,
    signals: &[PointsSignal],
) -> Result<Scores, SessionError> {
    let too_many = |detail: String| SessionError::TooManyPointsSignals {
        correlation_id: correlation_id.to_string(),
        detail,
    };

    if signals.len() > 2 {
        return Err(too_many(format!("{} distinct scores", signals.len())));
    }

    let mut scores = Scores::default();
    for signal in signals {
        let (slot, side) = if signal.from_me {
            (&mut scores.own, "own")
        } else {
            (&mut scores.opponent, "opponent")
        };
        if let Some(previous) = slot.replace(signal.points) {
            return Err(too_many(format!(
                "{} score is both {} and {}",
                side, previous, signal.points
            )));
        }
    }

    Ok(scores)
}

/// Read the number embedded in a phrase from all of its digits.
///
/// Fails when the phrase has no digits or they do not fit an `i64`.
fn parse_points(phrase: &str) -> Result<i64, ParseIntError> {
    let digits: String = phrase.chars().filter(char::is_ascii_digit).collect();
    digits.parse()
}

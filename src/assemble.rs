//! Persistence shape of reconstructed sessions.

use serde::{Deserialize, Serialize};

use crate::session::GameSession;
use crate::store::Keyed;

/// One row of the sessions table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub correlation_id: String,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub application_id: String,
    /// 1 won, 2 lost, 3 draw, 4 unknown
    pub outcome: u8,
    pub opponent_handle_id: i64,
    pub own_score: Option<i64>,
    pub opponent_score: Option<i64>,
}

impl Keyed for SessionRecord {
    fn key(&self) -> String {
        self.correlation_id.clone()
    }
}

pub fn session_record(session: &GameSession) -> SessionRecord {
    SessionRecord {
        correlation_id: session.correlation_id.clone(),
        start_timestamp: session.start_timestamp,
        end_timestamp: session.end_timestamp,
        application_id: session.application_id.clone(),
        outcome: session.outcome.code(),
        opponent_handle_id: session.opponent_handle_id,
        own_score: session.own_score,
        opponent_score: session.opponent_score,
    }
}

pub fn session_records(sessions: Vec<GameSession>) -> Vec<SessionRecord> {
    sessions.iter().map(session_record).collect()
}

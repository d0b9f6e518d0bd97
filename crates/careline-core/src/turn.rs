//! The append-only turn log (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Entities;

/// One outbound call made during a turn, recorded for audit and for the
/// HTTP response's transparency (spec §3: "list of backend calls made
/// during this turn (method, endpoint, success, status)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendCallRecord {
    pub method: String,
    pub endpoint: String,
    pub success: bool,
    pub status: Option<u16>,
}

/// One user-utterance/response pair, immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based ordinal index, contiguous within a session.
    pub index: u32,
    pub timestamp: DateTime<Utc>,
    pub raw_input: String,
    pub intent: String,
    pub entities: Entities,
    pub response_text: String,
    pub calls: Vec<BackendCallRecord>,
}

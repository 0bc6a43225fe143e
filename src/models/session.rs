//! Session-related data models.
//!
//! - `SessionStatus`, `SessionRecord`: the historical record appended on a confirmed save
//! - `SessionSummary`: what the learner must confirm or discard before the reader closes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sentinel::CheatIndicator;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Reading,
    AwaitingConfirmation,
    Confirmed,
    Discarded,
    /// Too short to count; closed without stats.
    Ghost,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub content_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub words_read: usize,
    pub units_read: usize,
    pub pace_wpm: f64,
    pub comprehension: Option<f64>,
    pub fast_track: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub content_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub words_read: usize,
    pub units_read: usize,
    pub elapsed_secs: f64,
    /// Capped words-per-minute for this session
    pub pace_wpm: f64,
    pub average_comprehension: Option<f64>,
    pub fast_track: bool,
    pub indicators: Vec<CheatIndicator>,
}

impl From<SessionSummary> for SessionRecord {
    fn from(summary: SessionSummary) -> Self {
        Self {
            id: summary.session_id,
            content_id: summary.content_id,
            started_at: summary.started_at,
            ended_at: summary.ended_at,
            words_read: summary.words_read,
            units_read: summary.units_read,
            pace_wpm: summary.pace_wpm,
            comprehension: summary.average_comprehension,
            fast_track: summary.fast_track,
        }
    }
}

/// Emitted once when the cursor first reaches the end of the text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub session_id: String,
    pub content_id: String,
    pub total_units: usize,
    pub completed_at: DateTime<Utc>,
}

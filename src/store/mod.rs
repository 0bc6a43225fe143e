//! Contracts for the collaborators the engine reads from and writes to.
//!
//! Implementations live outside this crate; [`MemoryStore`] backs the tests
//! and the demo runner.

mod memory;

pub use memory::{MemoryStore, MemoryTelemetry};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CapabilityProfile, CompletionEvent, DailyGoal, SessionRecord};
use crate::sentinel::CheatIndicator;

/// Saved reading position for one piece of content.
///
/// `position` is a word offset, so it survives a change of chunk policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub content_id: String,
    pub position: usize,
    pub updated_at: DateTime<Utc>,
}

impl ReadingProgress {
    pub fn new(content_id: impl Into<String>, position: usize) -> Self {
        Self {
            content_id: content_id.into(),
            position,
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn load_text(&self, content_id: &str) -> Result<String>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_progress(&self, content_id: &str) -> Result<Option<ReadingProgress>>;
    async fn save_progress(&self, progress: &ReadingProgress) -> Result<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_profile(&self) -> Result<CapabilityProfile>;
    async fn save_profile(&self, profile: &CapabilityProfile) -> Result<()>;
    async fn append_session(&self, record: &SessionRecord) -> Result<()>;
    async fn load_daily_goal(&self) -> Result<Option<DailyGoal>>;
    async fn save_daily_goal(&self, goal: &DailyGoal) -> Result<()>;
}

/// Fire-and-forget sink for advisory findings and completion events.
pub trait TelemetrySink: Send + Sync {
    fn record_indicator(&self, session_id: &str, indicator: &CheatIndicator);
    fn record_completion(&self, event: &CompletionEvent);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record_indicator(&self, _session_id: &str, _indicator: &CheatIndicator) {}
    fn record_completion(&self, _event: &CompletionEvent) {}
}

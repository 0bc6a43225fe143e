use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{CapabilityProfile, CompletionEvent, DailyGoal, SessionRecord};
use crate::sentinel::CheatIndicator;

use super::{ContentProvider, ProfileStore, ProgressStore, ReadingProgress, TelemetrySink};

#[derive(Default)]
struct MemoryInner {
    texts: HashMap<String, String>,
    progress: HashMap<String, ReadingProgress>,
    profile: CapabilityProfile,
    sessions: Vec<SessionRecord>,
    daily_goal: Option<DailyGoal>,
}

/// In-memory implementation of every store contract.
///
/// Progress reads and writes can be made to fail on demand.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    progress_saves: AtomicUsize,
    failing_progress_saves: AtomicU32,
    progress_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_text(&self, content_id: impl Into<String>, text: impl Into<String>) {
        self.inner
            .lock()
            .await
            .texts
            .insert(content_id.into(), text.into());
    }

    pub async fn set_profile(&self, profile: CapabilityProfile) {
        self.inner.lock().await.profile = profile;
    }

    pub async fn sessions(&self) -> Vec<SessionRecord> {
        self.inner.lock().await.sessions.clone()
    }

    pub async fn profile(&self) -> CapabilityProfile {
        self.inner.lock().await.profile.clone()
    }

    pub async fn daily_goal(&self) -> Option<DailyGoal> {
        self.inner.lock().await.daily_goal.clone()
    }

    pub async fn progress(&self, content_id: &str) -> Option<ReadingProgress> {
        self.inner.lock().await.progress.get(content_id).cloned()
    }

    /// Successful progress writes so far.
    pub fn progress_saves(&self) -> usize {
        self.progress_saves.load(Ordering::SeqCst)
    }

    /// The next `count` progress writes fail.
    pub fn fail_next_progress_saves(&self, count: u32) {
        self.failing_progress_saves.store(count, Ordering::SeqCst);
    }

    pub fn set_progress_unavailable(&self, unavailable: bool) {
        self.progress_unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentProvider for MemoryStore {
    async fn load_text(&self, content_id: &str) -> Result<String> {
        self.inner
            .lock()
            .await
            .texts
            .get(content_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown content '{content_id}'"))
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_progress(&self, content_id: &str) -> Result<Option<ReadingProgress>> {
        if self.progress_unavailable.load(Ordering::SeqCst) {
            return Err(anyhow!("progress store unavailable"));
        }
        Ok(self.inner.lock().await.progress.get(content_id).cloned())
    }

    async fn save_progress(&self, progress: &ReadingProgress) -> Result<()> {
        let failing = self.failing_progress_saves.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_progress_saves
                .store(failing - 1, Ordering::SeqCst);
            return Err(anyhow!("progress write rejected"));
        }

        self.inner
            .lock()
            .await
            .progress
            .insert(progress.content_id.clone(), progress.clone());
        self.progress_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load_profile(&self) -> Result<CapabilityProfile> {
        Ok(self.inner.lock().await.profile.clone())
    }

    async fn save_profile(&self, profile: &CapabilityProfile) -> Result<()> {
        self.inner.lock().await.profile = profile.clone();
        Ok(())
    }

    async fn append_session(&self, record: &SessionRecord) -> Result<()> {
        self.inner.lock().await.sessions.push(record.clone());
        Ok(())
    }

    async fn load_daily_goal(&self) -> Result<Option<DailyGoal>> {
        Ok(self.inner.lock().await.daily_goal.clone())
    }

    async fn save_daily_goal(&self, goal: &DailyGoal) -> Result<()> {
        self.inner.lock().await.daily_goal = Some(goal.clone());
        Ok(())
    }
}

/// Telemetry sink that keeps everything it receives.
#[derive(Default)]
pub struct MemoryTelemetry {
    indicators: StdMutex<Vec<(String, CheatIndicator)>>,
    completions: StdMutex<Vec<CompletionEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indicators(&self) -> Vec<(String, CheatIndicator)> {
        lock(&self.indicators).clone()
    }

    pub fn completions(&self) -> Vec<CompletionEvent> {
        lock(&self.completions).clone()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record_indicator(&self, session_id: &str, indicator: &CheatIndicator) {
        lock(&self.indicators).push((session_id.to_string(), indicator.clone()));
    }

    fn record_completion(&self, event: &CompletionEvent) {
        lock(&self.completions).push(event.clone());
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

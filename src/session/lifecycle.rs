use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audio::{AmbientFader, AmbientOutput};
use crate::chunking::{chunk_text, unit_at_word, ChunkPolicy};
use crate::difficulty::{DifficultyLevel, DifficultyScaler};
use crate::error::ReaderError;
use crate::input::{InputNormalizer, RawInput};
use crate::models::{
    CapabilityProfile, CompletionEvent, DailyGoal, SessionRecord, SessionStatus, SessionSummary,
};
use crate::performance::{PerformanceTracker, ReadingMetricSample, TrackerState};
use crate::presenter::{PresentationScheduler, PresenterEvent, PresenterSnapshot, PresenterStatus};
use crate::sentinel::{CheatIndicator, CheatKind, InteractionSentinel};
use crate::settings::EngineConfig;
use crate::store::{ContentProvider, MemoryStore, NoopTelemetry, ProfileStore, ProgressStore, TelemetrySink};

use super::goals::DailyGoalTracker;
use super::progress::ProgressSaver;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Ways a learner can ask to leave the reader. All of them are arbitrated
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseIntent {
    Control,
    CancelKey,
    Backdrop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitOutcome {
    /// The reader closed without a summary.
    Closed { ghost: bool, words_read: usize },
    /// The summary must be confirmed or discarded before the reader closes.
    SummaryPending(SessionSummary),
}

/// External collaborators a lifecycle talks to.
#[derive(Clone)]
pub struct SessionStores {
    pub content: Arc<dyn ContentProvider>,
    pub progress: Arc<dyn ProgressStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl SessionStores {
    pub fn new(
        content: Arc<dyn ContentProvider>,
        progress: Arc<dyn ProgressStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            content,
            progress,
            profiles,
            telemetry: Arc::new(NoopTelemetry),
        }
    }

    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }
}

struct ActiveSession {
    id: String,
    content_id: String,
    text: String,
    started_at: DateTime<Utc>,
    started: Instant,
    profile: CapabilityProfile,
    status: SessionStatus,
    summary: Option<SessionSummary>,
    progress: Arc<ProgressSaver>,
    forwarder: Option<(CancellationToken, JoinHandle<()>)>,
    comprehension: Vec<f64>,
    instructions_shown_at: Option<DateTime<Utc>>,
    reported: HashSet<CheatKind>,
    indicators: Vec<CheatIndicator>,
}

impl ActiveSession {
    fn average_comprehension(&self) -> Option<f64> {
        if self.comprehension.is_empty() {
            return None;
        }
        Some(self.comprehension.iter().sum::<f64>() / self.comprehension.len() as f64)
    }

    /// Keeps the first indicator of each kind; later repeats are dropped.
    fn report(
        &mut self,
        telemetry: &dyn TelemetrySink,
        found: Vec<CheatIndicator>,
    ) -> Vec<CheatIndicator> {
        let fresh: Vec<CheatIndicator> = found
            .into_iter()
            .filter(|indicator| self.reported.insert(indicator.kind))
            .collect();
        for indicator in &fresh {
            telemetry.record_indicator(&self.id, indicator);
            self.indicators.push(indicator.clone());
        }
        fresh
    }
}

/// Sole entry and exit point of a reading session.
///
/// Owns the scheduler, tracker and sentinel for the session's lifetime. Every
/// close request goes through [`SessionLifecycle::request_exit`], which stops
/// presentation before anything is measured and withholds the close until the
/// summary is confirmed or discarded.
pub struct SessionLifecycle {
    config: EngineConfig,
    stores: SessionStores,
    scheduler: PresentationScheduler,
    tracker: PerformanceTracker,
    sentinel: InteractionSentinel,
    normalizer: InputNormalizer,
    scaler: DifficultyScaler,
    fader: AmbientFader,
    rng: StdRng,
    chunk_policy: ChunkPolicy,
    session: Option<ActiveSession>,
    /// How the previous session ended, until the next one starts
    closed_as: Option<SessionStatus>,
}

impl SessionLifecycle {
    pub fn new(config: EngineConfig, stores: SessionStores) -> Self {
        let config = config.sanitized();
        let fader = AmbientFader::new(default_output(), config.ambient_audio.clone());

        Self {
            scheduler: PresentationScheduler::new(config.scheduler_config()),
            tracker: PerformanceTracker::new(config.sample_window_size, config.fast_track.clone()),
            sentinel: InteractionSentinel::new(config.anti_cheat.clone()),
            normalizer: InputNormalizer::new(),
            scaler: DifficultyScaler::new(config.difficulty_config()),
            fader,
            rng: StdRng::from_entropy(),
            chunk_policy: config.chunk_policy,
            session: None,
            closed_as: None,
            stores,
            config,
        }
    }

    /// Fixes the seed used by `Auto` chunking.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_audio_output(mut self, output: Arc<dyn AmbientOutput>) -> Self {
        self.fader = AmbientFader::new(output, self.config.ambient_audio.clone());
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &PresentationScheduler {
        &self.scheduler
    }

    pub fn chunk_policy(&self) -> ChunkPolicy {
        self.chunk_policy
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    /// Status of the open session, or how the last one closed.
    pub fn status(&self) -> Option<SessionStatus> {
        self.session.as_ref().map(|s| s.status).or(self.closed_as)
    }

    pub fn pending_summary(&self) -> Option<&SessionSummary> {
        self.session.as_ref().and_then(|s| s.summary.as_ref())
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.get_state()
    }

    pub fn fader(&self) -> &AmbientFader {
        &self.fader
    }

    pub async fn snapshot(&self) -> PresenterSnapshot {
        self.scheduler.snapshot().await
    }

    /// Difficulty the scaler derives from the active session's profile.
    pub fn difficulty(&self) -> Option<DifficultyLevel> {
        self.session.as_ref().map(|s| {
            if s.profile.fast_track {
                self.scaler.get_fast_track_difficulty(&s.profile)
            } else {
                self.scaler.calculate_difficulty(&s.profile)
            }
        })
    }

    /// Opens `content_id` for reading, resuming from its saved position.
    pub async fn start(&mut self, content_id: &str) -> Result<PresenterSnapshot> {
        if self.session.is_some() {
            return Err(ReaderError::SessionAlreadyActive.into());
        }

        let text = self.stores.content.load_text(content_id).await?;
        self.closed_as = None;

        let profile = match self.stores.profiles.load_profile().await {
            Ok(profile) => profile,
            Err(err) => {
                log_warn!("profile unavailable, starting from defaults: {err:?}");
                CapabilityProfile::default()
            }
        };

        let position = match self.stores.progress.get_progress(content_id).await {
            Ok(saved) => saved.map(|p| p.position).unwrap_or(0),
            Err(err) => {
                log_warn!("progress for {content_id} unavailable, starting at 0: {err:?}");
                0
            }
        };

        let units = chunk_text(&text, &self.config.chunk_config_for(self.chunk_policy), &mut self.rng);
        let cursor = unit_at_word(&units, position);

        self.tracker.reset();
        self.sentinel.reset();
        self.normalizer = InputNormalizer::new();

        let pace = self.initial_pace(&profile);
        self.scheduler.set_pace(pace).await;
        let snapshot = self
            .scheduler
            .load(units, cursor, self.chunk_policy.is_single())
            .await;

        let session_id = Uuid::new_v4().to_string();
        let progress = Arc::new(ProgressSaver::new(
            self.stores.progress.clone(),
            content_id,
            Duration::from_millis(self.config.progress_debounce_ms),
        ));
        let forwarder = self.spawn_forwarder(&session_id, content_id, progress.clone());

        log_info!(
            "session {} started on {} at unit {}/{} ({} wpm)",
            session_id,
            content_id,
            snapshot.cursor,
            snapshot.total_units,
            snapshot.pace_wpm
        );

        self.session = Some(ActiveSession {
            id: session_id,
            content_id: content_id.to_string(),
            text,
            started_at: Utc::now(),
            started: Instant::now(),
            profile,
            status: SessionStatus::Reading,
            summary: None,
            progress,
            forwarder: Some(forwarder),
            comprehension: Vec::new(),
            instructions_shown_at: None,
            reported: HashSet::new(),
            indicators: Vec::new(),
        });

        Ok(snapshot)
    }

    fn initial_pace(&self, profile: &CapabilityProfile) -> u32 {
        if let Some(pace) = self.config.pace_override.or(profile.preferred_pace) {
            return pace;
        }
        if !profile.has_history() {
            return self.config.pace_wpm;
        }
        let level = if profile.fast_track {
            self.scaler.get_fast_track_difficulty(profile)
        } else {
            self.scaler.calculate_difficulty(profile)
        };
        level.pace_target
    }

    fn spawn_forwarder(
        &self,
        session_id: &str,
        content_id: &str,
        progress: Arc<ProgressSaver>,
    ) -> (CancellationToken, JoinHandle<()>) {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let mut events = self.scheduler.subscribe();
        let telemetry = self.stores.telemetry.clone();
        let session_id = session_id.to_string();
        let content_id = content_id.to_string();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(PresenterEvent::UnitShown { word_offset, .. }) => {
                            progress.note(word_offset).await;
                        }
                        Ok(PresenterEvent::StateChanged(snapshot)) => {
                            progress.note(snapshot.word_offset).await;
                        }
                        Ok(PresenterEvent::Completed { total_units }) => {
                            telemetry.record_completion(&CompletionEvent {
                                session_id: session_id.clone(),
                                content_id: content_id.clone(),
                                total_units,
                                completed_at: Utc::now(),
                            });
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            log_warn!("session event forwarder skipped {skipped} events");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });

        (token, handle)
    }

    fn reading(&self) -> Result<&ActiveSession, ReaderError> {
        self.session
            .as_ref()
            .filter(|s| s.status == SessionStatus::Reading)
            .ok_or(ReaderError::NoActiveSession)
    }

    pub async fn play(&mut self) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        let snapshot = self.scheduler.play().await?;
        self.fader.fade_in();
        Ok(snapshot)
    }

    pub async fn pause(&mut self) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        Ok(self.scheduler.pause().await)
    }

    pub async fn toggle(&mut self) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        let snapshot = self.scheduler.toggle().await?;
        if snapshot.status == PresenterStatus::Playing {
            self.fader.fade_in();
        }
        Ok(snapshot)
    }

    pub async fn seek_forward(&mut self) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        self.scheduler.seek_forward().await
    }

    pub async fn seek_backward(&mut self) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        self.scheduler.seek_backward().await
    }

    pub async fn seek_by(&mut self, delta: isize) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        self.scheduler.seek_by(delta).await
    }

    pub async fn reset(&mut self) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        Ok(self.scheduler.reset().await)
    }

    /// Manual pace change; returns the pace actually applied.
    pub async fn set_pace(&mut self, wpm: u32) -> Result<u32, ReaderError> {
        self.reading()?;
        Ok(self.scheduler.set_pace(wpm).await)
    }

    pub async fn enter_interlude(&mut self) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        Ok(self.scheduler.enter_interlude().await)
    }

    pub async fn finish_interlude(&mut self) -> Result<PresenterSnapshot, ReaderError> {
        self.reading()?;
        Ok(self.scheduler.finish_interlude().await)
    }

    /// Switches the chunk policy; an open session is re-chunked in place with
    /// its relative position kept.
    pub async fn rechunk(&mut self, policy: ChunkPolicy) -> Option<PresenterSnapshot> {
        self.chunk_policy = policy;
        let session = self
            .session
            .as_ref()
            .filter(|s| s.status == SessionStatus::Reading)?;

        let units = chunk_text(&session.text, &self.config.chunk_config_for(policy), &mut self.rng);
        log_info!("rechunked to policy {} ({} units)", policy, units.len());
        Some(self.scheduler.replace_units(units, policy.is_single()).await)
    }

    /// Feeds one comprehension check into the tracker. Returns true when
    /// this sample unlocked fast-track.
    pub async fn record_comprehension(&mut self, score: f64) -> Result<bool, ReaderError> {
        self.reading()?;
        let snapshot = self.scheduler.snapshot().await;
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };

        if let Some(session) = self.session.as_mut() {
            session.comprehension.push(score);
        }
        let triggered = self.tracker.record_metric(ReadingMetricSample::new(
            snapshot.pace_wpm as f64,
            score,
            snapshot.progress,
        ));
        if triggered {
            log_info!("fast-track unlocked at {:.0}% progress", snapshot.progress * 100.0);
        }
        Ok(triggered)
    }

    /// Normalizes a raw input event and runs the sentinel over the window.
    /// Returns indicators not yet reported this session; they are advisory
    /// and never change playback.
    pub fn record_interaction(&mut self, raw: RawInput) -> Result<Vec<CheatIndicator>, ReaderError> {
        let session = self
            .session
            .as_mut()
            .filter(|s| s.status == SessionStatus::Reading)
            .ok_or(ReaderError::NoActiveSession)?;

        let Some(event) = self.normalizer.normalize(raw) else {
            return Ok(Vec::new());
        };
        self.sentinel.record_interaction(event);
        let found = self.sentinel.analyze_pattern();
        Ok(session.report(self.stores.telemetry.as_ref(), found))
    }

    pub fn mark_instructions_shown(&mut self, at: DateTime<Utc>) -> Result<(), ReaderError> {
        let session = self
            .session
            .as_mut()
            .filter(|s| s.status == SessionStatus::Reading)
            .ok_or(ReaderError::NoActiveSession)?;
        session.instructions_shown_at = Some(at);
        Ok(())
    }

    /// Whether the learner moved on from the instructions too quickly.
    pub fn check_instruction_skip(&mut self) -> Result<bool, ReaderError> {
        let session = self
            .session
            .as_mut()
            .filter(|s| s.status == SessionStatus::Reading)
            .ok_or(ReaderError::NoActiveSession)?;
        let Some(shown_at) = session.instructions_shown_at else {
            return Ok(false);
        };

        match self.sentinel.instruction_skip_indicator(shown_at) {
            Some(indicator) => {
                session.report(self.stores.telemetry.as_ref(), vec![indicator]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Arbitrates a close request.
    ///
    /// Presentation is stopped and the forwarder drained first, so the cursor
    /// cannot move while the position is saved and words are counted. A
    /// session below the ghost threshold closes silently; anything else
    /// yields the summary, and repeated requests return that same summary.
    pub async fn request_exit(&mut self, intent: CloseIntent) -> Result<ExitOutcome, ReaderError> {
        let Some(session) = self.session.as_mut() else {
            return Err(ReaderError::NoActiveSession);
        };
        if let Some(summary) = &session.summary {
            return Ok(ExitOutcome::SummaryPending(summary.clone()));
        }
        log_info!("close requested for session {} via {:?}", session.id, intent);

        self.scheduler.stop().await;
        if let Some((token, handle)) = session.forwarder.take() {
            token.cancel();
            let _ = handle.await;
        }

        let state = self.scheduler.state().await;
        session.progress.flush(state.word_offset(state.cursor)).await;
        let words_read = state.words_read();
        self.fader.fade_out();

        if words_read < self.config.ghost_session_word_threshold {
            log_info!(
                "session {} closed as ghost after {} words",
                session.id,
                words_read
            );
            self.session = None;
            self.closed_as = Some(SessionStatus::Ghost);
            return Ok(ExitOutcome::Closed {
                ghost: true,
                words_read,
            });
        }

        let found = self.sentinel.analyze_pattern();
        session.report(self.stores.telemetry.as_ref(), found);

        let elapsed_secs = session.started.elapsed().as_secs_f64();
        let summary = SessionSummary {
            session_id: session.id.clone(),
            content_id: session.content_id.clone(),
            started_at: session.started_at,
            ended_at: Utc::now(),
            words_read,
            units_read: state.units_read(),
            elapsed_secs,
            pace_wpm: session_pace(words_read, elapsed_secs, self.config.max_session_pace),
            average_comprehension: session.average_comprehension(),
            fast_track: self.tracker.is_fast_track(),
            indicators: session.indicators.clone(),
        };

        session.status = SessionStatus::AwaitingConfirmation;
        session.summary = Some(summary.clone());
        Ok(ExitOutcome::SummaryPending(summary))
    }

    /// Accepts the pending summary: the profile, session history and daily
    /// goal are updated exactly once.
    pub async fn confirm_summary(&mut self) -> Result<SessionRecord, ReaderError> {
        let summary = self
            .pending_summary()
            .cloned()
            .ok_or(ReaderError::NoPendingSummary)?;
        let Some(session) = self.session.take() else {
            return Err(ReaderError::NoPendingSummary);
        };

        let profile = self.scaler.update_profile(
            &session.profile,
            summary.pace_wpm,
            summary.average_comprehension,
            summary.fast_track,
        );
        if let Err(err) = self.stores.profiles.save_profile(&profile).await {
            log_warn!("profile not saved: {err:?}");
        }

        let record = SessionRecord::from(summary);
        if let Err(err) = self.stores.profiles.append_session(&record).await {
            log_warn!("session record not saved: {err:?}");
        }

        let today = Local::now().date_naive();
        let mut goal = DailyGoalTracker::resume(self.load_goal().await, self.config.daily_goal_words, today);
        if goal.record_session(&record.id, record.words_read, today) {
            if let Err(err) = self.stores.profiles.save_daily_goal(goal.goal()).await {
                log_warn!("daily goal not saved: {err:?}");
            }
        }

        self.closed_as = Some(SessionStatus::Confirmed);
        log_info!(
            "session {} confirmed: {} words at {:.0} wpm",
            record.id,
            record.words_read,
            record.pace_wpm
        );
        Ok(record)
    }

    /// Drops the pending summary; nothing is recorded.
    pub fn discard_summary(&mut self) -> Result<(), ReaderError> {
        if self.pending_summary().is_none() {
            return Err(ReaderError::NoPendingSummary);
        }
        if let Some(session) = self.session.take() {
            log_info!("session {} discarded", session.id);
        }
        self.closed_as = Some(SessionStatus::Discarded);
        Ok(())
    }

    pub async fn daily_goal(&self) -> DailyGoal {
        let today = Local::now().date_naive();
        DailyGoalTracker::resume(self.load_goal().await, self.config.daily_goal_words, today)
            .into_goal()
    }

    async fn load_goal(&self) -> Option<DailyGoal> {
        match self.stores.profiles.load_daily_goal().await {
            Ok(goal) => goal,
            Err(err) => {
                log_warn!("daily goal unavailable: {err:?}");
                None
            }
        }
    }
}

impl Drop for SessionLifecycle {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Some((token, handle)) = session.forwarder.take() {
                token.cancel();
                handle.abort();
            }
        }
        self.scheduler.abort_pending_tick();
        self.fader.stop_now();
    }
}

/// Words per minute over the session, capped; no elapsed time means the cap.
fn session_pace(words: usize, elapsed_secs: f64, cap: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return cap;
    }
    (words as f64 / elapsed_secs * 60.0).min(cap)
}

#[cfg(feature = "ambient-audio")]
fn default_output() -> Arc<dyn AmbientOutput> {
    Arc::new(crate::audio::AudioEngineHandle::new())
}

#[cfg(not(feature = "ambient-audio"))]
fn default_output() -> Arc<dyn AmbientOutput> {
    Arc::new(crate::audio::NullOutput)
}

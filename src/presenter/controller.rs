use std::sync::Arc;

use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};

use crate::chunking::TextUnit;
use crate::error::ReaderError;

use super::state::{PresentationState, PresenterStatus, SchedulerConfig, TickOutcome};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenterSnapshot {
    pub status: PresenterStatus,
    pub cursor: usize,
    pub total_units: usize,
    pub pace_wpm: u32,
    pub progress: f64,
    pub words_read: usize,
    pub word_offset: usize,
    pub current: Option<TextUnit>,
}

impl From<&PresentationState> for PresenterSnapshot {
    fn from(state: &PresentationState) -> Self {
        Self {
            status: state.status,
            cursor: state.cursor,
            total_units: state.len(),
            pace_wpm: state.pace_wpm,
            progress: state.progress(),
            words_read: state.words_read(),
            word_offset: state.word_offset(state.cursor),
            current: state.current_unit().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PresenterEvent {
    /// The cursor moved onto a new unit by itself.
    #[serde(rename_all = "camelCase")]
    UnitShown { cursor: usize, word_offset: usize },
    StateChanged(PresenterSnapshot),
    #[serde(rename_all = "camelCase")]
    Completed { total_units: usize },
}

/// Drives a [`PresentationState`] in real time.
///
/// Exactly one tick task is alive per arm. Every transition aborts the
/// previous task and bumps the state epoch before a new one is spawned, so
/// a tick that raced its own cancellation is rejected by the state.
#[derive(Clone)]
pub struct PresentationScheduler {
    state: Arc<Mutex<PresentationState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: Arc<SchedulerConfig>,
    events: broadcast::Sender<PresenterEvent>,
}

impl PresentationScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(PresentationState::new(config.clamp_wpm(config.default_wpm)))),
            ticker: Arc::new(Mutex::new(None)),
            config: Arc::new(config),
            events,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenterEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> PresenterSnapshot {
        PresenterSnapshot::from(&*self.state.lock().await)
    }

    pub async fn words_read(&self) -> usize {
        self.state.lock().await.words_read()
    }

    pub async fn state(&self) -> PresentationState {
        self.state.lock().await.clone()
    }

    /// Whether a tick task is still scheduled.
    pub async fn has_pending_tick(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub async fn load(
        &self,
        units: Vec<TextUnit>,
        cursor: usize,
        single_word_timing: bool,
    ) -> PresenterSnapshot {
        let mut state = self.state.lock().await;
        state.load(units, cursor, single_word_timing);
        self.rearm(&mut state).await;
        log_debug!("loaded {} units at cursor {}", state.len(), state.cursor);
        self.publish(&state)
    }

    pub async fn play(&self) -> Result<PresenterSnapshot, ReaderError> {
        let mut state = self.state.lock().await;
        if state.play()? {
            self.rearm(&mut state).await;
            log_info!("presentation playing from unit {}", state.cursor);
        }
        Ok(self.publish(&state))
    }

    pub async fn pause(&self) -> PresenterSnapshot {
        let mut state = self.state.lock().await;
        if state.pause() {
            self.rearm(&mut state).await;
        }
        self.publish(&state)
    }

    pub async fn toggle(&self) -> Result<PresenterSnapshot, ReaderError> {
        let playing = self.state.lock().await.status == PresenterStatus::Playing;
        if playing {
            Ok(self.pause().await)
        } else {
            self.play().await
        }
    }

    pub async fn seek_forward(&self) -> Result<PresenterSnapshot, ReaderError> {
        self.seek_by(self.config.seek_step as isize).await
    }

    pub async fn seek_backward(&self) -> Result<PresenterSnapshot, ReaderError> {
        self.seek_by(-(self.config.seek_step as isize)).await
    }

    /// Moves by `delta` units. Playback is paused first.
    pub async fn seek_by(&self, delta: isize) -> Result<PresenterSnapshot, ReaderError> {
        let mut state = self.state.lock().await;
        state.seek(delta)?;
        self.rearm(&mut state).await;
        Ok(self.publish(&state))
    }

    pub async fn reset(&self) -> PresenterSnapshot {
        let mut state = self.state.lock().await;
        state.reset();
        self.rearm(&mut state).await;
        self.publish(&state)
    }

    /// Applies a new pace, clamped to the configured range. While playing,
    /// the pending tick is rescheduled at the new pace.
    pub async fn set_pace(&self, wpm: u32) -> u32 {
        let effective = self.config.clamp_wpm(wpm);
        if effective != wpm {
            log_warn!("pace {} wpm outside range, using {}", wpm, effective);
        }

        let mut state = self.state.lock().await;
        if state.pace_wpm == effective {
            return effective;
        }
        state.set_pace(effective);
        if state.status == PresenterStatus::Playing {
            self.rearm(&mut state).await;
        }
        self.publish(&state);
        effective
    }

    pub async fn enter_interlude(&self) -> PresenterSnapshot {
        let mut state = self.state.lock().await;
        if state.enter_interlude() {
            self.rearm(&mut state).await;
        }
        self.publish(&state)
    }

    pub async fn finish_interlude(&self) -> PresenterSnapshot {
        let mut state = self.state.lock().await;
        if state.finish_interlude() {
            self.rearm(&mut state).await;
        }
        self.publish(&state)
    }

    pub async fn replace_units(
        &self,
        units: Vec<TextUnit>,
        single_word_timing: bool,
    ) -> PresenterSnapshot {
        let mut state = self.state.lock().await;
        state.replace_units(units, single_word_timing);
        self.rearm(&mut state).await;
        self.publish(&state)
    }

    /// Cancels any scheduled tick and pauses. Used before a session is torn
    /// down so nothing advances while its summary is being built.
    pub async fn stop(&self) -> PresenterSnapshot {
        let mut state = self.state.lock().await;
        state.pause();
        self.rearm(&mut state).await;
        self.publish(&state)
    }

    /// Synchronous best-effort cancel for `Drop` paths that cannot await.
    pub fn abort_pending_tick(&self) {
        if let Ok(mut ticker) = self.ticker.try_lock() {
            if let Some(handle) = ticker.take() {
                handle.abort();
            }
        }
    }

    /// Aborts the current tick task and, if the state is playing, spawns a
    /// fresh one for the new epoch. Lock order is always state then ticker.
    async fn rearm(&self, state: &mut PresentationState) {
        let mut ticker = self.ticker.lock().await;
        if let Some(handle) = ticker.take() {
            handle.abort();
        }

        let Some((epoch, delay)) = state.arm(&self.config.rhythm) else {
            return;
        };

        let shared = self.state.clone();
        let config = self.config.clone();
        let events = self.events.clone();

        *ticker = Some(tokio::spawn(async move {
            let mut delay = delay;
            loop {
                time::sleep(delay).await;

                let mut guard = shared.lock().await;
                match guard.on_tick(epoch, &config) {
                    TickOutcome::Advanced { next_delay } => {
                        let _ = events.send(PresenterEvent::UnitShown {
                            cursor: guard.cursor,
                            word_offset: guard.word_offset(guard.cursor),
                        });
                        delay = next_delay;
                    }
                    TickOutcome::Completed => {
                        log_info!("presentation reached the end after {} units", guard.len());
                        let _ = events.send(PresenterEvent::StateChanged(
                            PresenterSnapshot::from(&*guard),
                        ));
                        let _ = events.send(PresenterEvent::Completed {
                            total_units: guard.len(),
                        });
                        break;
                    }
                    TickOutcome::Interlude => {
                        log_debug!("guided break at unit {}", guard.cursor);
                        let _ = events.send(PresenterEvent::StateChanged(
                            PresenterSnapshot::from(&*guard),
                        ));
                        break;
                    }
                    TickOutcome::Stale => break,
                }
            }
        }));
    }

    fn publish(&self, state: &PresentationState) -> PresenterSnapshot {
        let snapshot = PresenterSnapshot::from(state);
        let _ = self.events.send(PresenterEvent::StateChanged(snapshot.clone()));
        snapshot
    }
}

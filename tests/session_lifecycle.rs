use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use readpace_lib::audio::{AmbientAudioConfig, AmbientOutput};

use readpace_lib::input::{PointerKind, RawInput};
use readpace_lib::models::{CapabilityProfile, SessionStatus};
use readpace_lib::presenter::PresenterStatus;
use readpace_lib::sentinel::{CheatKind, Position};
use readpace_lib::store::{MemoryTelemetry, ReadingProgress};
use readpace_lib::store::ProgressStore;
use readpace_lib::{
    ChunkPolicy, CloseIntent, EngineConfig, ExitOutcome, MemoryStore, ReaderError,
    SessionLifecycle, SessionStores,
};

const DOC: &str = "doc";

fn words(n: usize) -> String {
    (0..n).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
}

async fn setup(text: &str) -> (Arc<MemoryStore>, SessionLifecycle) {
    let store = Arc::new(MemoryStore::new());
    store.insert_text(DOC, text).await;
    let lifecycle = SessionLifecycle::new(
        EngineConfig {
            pace_wpm: 600,
            ..EngineConfig::default()
        },
        SessionStores::from_memory(store.clone()),
    )
    .with_seed(7);
    (store, lifecycle)
}

#[tokio::test(start_paused = true)]
async fn nine_words_is_a_ghost_session() {
    let (store, mut lifecycle) = setup(&words(40)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.seek_by(9).await.unwrap();

    let outcome = lifecycle.request_exit(CloseIntent::Backdrop).await.unwrap();
    assert_eq!(
        outcome,
        ExitOutcome::Closed {
            ghost: true,
            words_read: 9
        }
    );
    assert_eq!(lifecycle.status(), Some(SessionStatus::Ghost));
    assert!(store.sessions().await.is_empty());
    // position is still saved for resume
    assert_eq!(store.progress(DOC).await.map(|p| p.position), Some(9));
}

#[tokio::test(start_paused = true)]
async fn ten_words_requires_a_summary() {
    let (store, mut lifecycle) = setup(&words(40)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.seek_by(10).await.unwrap();

    let summary = match lifecycle.request_exit(CloseIntent::Control).await.unwrap() {
        ExitOutcome::SummaryPending(summary) => summary,
        other => panic!("expected a summary, got {other:?}"),
    };
    assert_eq!(summary.words_read, 10);
    assert!(summary.pace_wpm <= lifecycle.config().max_session_pace);

    // no other close path skips the summary
    for intent in [CloseIntent::CancelKey, CloseIntent::Backdrop, CloseIntent::Control] {
        assert_eq!(
            lifecycle.request_exit(intent).await.unwrap(),
            ExitOutcome::SummaryPending(summary.clone())
        );
    }
    assert_eq!(lifecycle.play().await, Err(ReaderError::NoActiveSession));
    let err = lifecycle.start(DOC).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReaderError>(),
        Some(&ReaderError::SessionAlreadyActive)
    );
    assert!(store.sessions().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn confirming_updates_profile_and_goal_once() {
    let (store, mut lifecycle) = setup(&words(60)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.play().await.unwrap();
    // 600 wpm with no rhythm boost on "wordN": 100ms per unit
    tokio::time::sleep(Duration::from_millis(2_050)).await;
    lifecycle.record_comprehension(0.9).await.unwrap();

    let summary = match lifecycle.request_exit(CloseIntent::Control).await.unwrap() {
        ExitOutcome::SummaryPending(summary) => summary,
        other => panic!("expected a summary, got {other:?}"),
    };
    assert_eq!(summary.words_read, 20);
    assert_eq!(summary.average_comprehension, Some(0.9));

    assert_eq!(lifecycle.status(), Some(SessionStatus::AwaitingConfirmation));
    let record = lifecycle.confirm_summary().await.unwrap();
    assert_eq!(record.words_read, 20);
    assert_eq!(lifecycle.status(), Some(SessionStatus::Confirmed));
    assert_eq!(
        lifecycle.confirm_summary().await,
        Err(ReaderError::NoPendingSummary)
    );

    let profile = store.profile().await;
    assert_eq!(profile.session_count, 1);
    assert!(profile.max_sustained_pace > 0.0);
    assert_eq!(store.sessions().await.len(), 1);

    let goal = lifecycle.daily_goal().await;
    assert_eq!(goal.words_today, 20);
    assert_eq!(goal.sessions_today, 1);
}

#[tokio::test(start_paused = true)]
async fn discarding_records_nothing() {
    let (store, mut lifecycle) = setup(&words(40)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.seek_by(20).await.unwrap();
    lifecycle.request_exit(CloseIntent::Control).await.unwrap();

    lifecycle.discard_summary().unwrap();
    assert_eq!(lifecycle.status(), Some(SessionStatus::Discarded));
    assert_eq!(lifecycle.discard_summary(), Err(ReaderError::NoPendingSummary));
    assert_eq!(store.profile().await.session_count, 0);
    assert!(store.sessions().await.is_empty());
    assert!(store.daily_goal().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn resumes_from_saved_word_offset() {
    let (store, mut lifecycle) = setup(&words(40)).await;
    store
        .save_progress(&ReadingProgress::new(DOC, 12))
        .await
        .unwrap();

    let snapshot = lifecycle.start(DOC).await.unwrap();
    assert_eq!(snapshot.cursor, 12);
    assert_eq!(snapshot.words_read, 0);
}

#[tokio::test(start_paused = true)]
async fn unavailable_progress_starts_at_zero() {
    let (store, mut lifecycle) = setup(&words(40)).await;
    store.set_progress_unavailable(true);
    let snapshot = lifecycle.start(DOC).await.unwrap();
    assert_eq!(snapshot.cursor, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_final_save_is_retried_and_never_fatal() {
    let (store, mut lifecycle) = setup(&words(40)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.seek_by(15).await.unwrap();
    // let the debounced save from the seek land first
    tokio::time::sleep(Duration::from_secs(1)).await;
    lifecycle.seek_by(3).await.unwrap();

    store.fail_next_progress_saves(2);
    let outcome = lifecycle.request_exit(CloseIntent::Control).await.unwrap();
    assert!(matches!(outcome, ExitOutcome::SummaryPending(_)));
    assert_eq!(store.progress(DOC).await.map(|p| p.position), Some(15));
    lifecycle.confirm_summary().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn rapid_seeks_coalesce_into_one_save() {
    let (store, mut lifecycle) = setup(&words(200)).await;
    lifecycle.start(DOC).await.unwrap();
    for _ in 0..6 {
        lifecycle.seek_forward().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(store.progress_saves(), 1);
    assert_eq!(store.progress(DOC).await.map(|p| p.position), Some(60));
}

#[tokio::test(start_paused = true)]
async fn completion_reaches_telemetry_once() {
    let store = Arc::new(MemoryStore::new());
    store.insert_text(DOC, words(5)).await;
    let telemetry = Arc::new(MemoryTelemetry::new());
    let mut lifecycle = SessionLifecycle::new(
        EngineConfig {
            pace_wpm: 600,
            ..EngineConfig::default()
        },
        SessionStores::from_memory(store.clone()).with_telemetry(telemetry.clone()),
    );

    lifecycle.start(DOC).await.unwrap();
    lifecycle.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert_eq!(lifecycle.snapshot().await.status, PresenterStatus::Ended);

    lifecycle.seek_backward().await.unwrap();
    lifecycle.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_050)).await;

    let completions = telemetry.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].total_units, 5);
}

#[tokio::test(start_paused = true)]
async fn exit_stops_the_presentation() {
    let (_store, mut lifecycle) = setup(&words(100)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_550)).await;

    let outcome = lifecycle.request_exit(CloseIntent::CancelKey).await.unwrap();
    let words_at_exit = match outcome {
        ExitOutcome::SummaryPending(summary) => summary.words_read,
        other => panic!("expected a summary, got {other:?}"),
    };
    assert_eq!(words_at_exit, 15);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!lifecycle.scheduler().has_pending_tick().await);
    assert_eq!(lifecycle.snapshot().await.cursor, 15);
}

#[tokio::test(start_paused = true)]
async fn rechunk_keeps_relative_position() {
    let (_store, mut lifecycle) = setup(&words(100)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.seek_by(40).await.unwrap();

    let snapshot = lifecycle.rechunk(ChunkPolicy::Pair).await.unwrap();
    assert_eq!(snapshot.total_units, 50);
    assert_eq!(snapshot.cursor, 20);
    assert_eq!(snapshot.word_offset, 40);
}

#[tokio::test(start_paused = true)]
async fn machine_clicking_is_reported_but_never_blocks() {
    let store = Arc::new(MemoryStore::new());
    store.insert_text(DOC, words(40)).await;
    let telemetry = Arc::new(MemoryTelemetry::new());
    let mut lifecycle = SessionLifecycle::new(
        EngineConfig::default(),
        SessionStores::from_memory(store).with_telemetry(telemetry.clone()),
    );
    lifecycle.start(DOC).await.unwrap();

    let base = chrono::Utc::now();
    let mut reported = Vec::new();
    for i in 0..12 {
        reported.extend(
            lifecycle
                .record_interaction(RawInput::PointerDown {
                    pointer: PointerKind::Mouse,
                    position: Position::new(400.0, 300.0),
                    timestamp: base + chrono::Duration::milliseconds(i * 30),
                    target: None,
                })
                .unwrap(),
        );
    }

    assert!(reported.iter().any(|i| i.kind == CheatKind::TimingAnomaly));
    let anomalies = telemetry
        .indicators()
        .iter()
        .filter(|(_, i)| i.kind == CheatKind::TimingAnomaly)
        .count();
    assert_eq!(anomalies, 1);
    assert!(lifecycle.play().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn manual_override_wins_over_profile() {
    let store = Arc::new(MemoryStore::new());
    store.insert_text(DOC, words(40)).await;
    store
        .set_profile(CapabilityProfile {
            current_pace: 280.0,
            max_sustained_pace: 300.0,
            comprehension_score: 0.8,
            session_count: 4,
            ..CapabilityProfile::default()
        })
        .await;

    let mut computed = SessionLifecycle::new(
        EngineConfig::default(),
        SessionStores::from_memory(store.clone()),
    );
    assert_eq!(computed.start(DOC).await.unwrap().pace_wpm, 315);

    let mut pinned = SessionLifecycle::new(
        EngineConfig {
            pace_override: Some(450),
            ..EngineConfig::default()
        },
        SessionStores::from_memory(store),
    );
    assert_eq!(pinned.start(DOC).await.unwrap().pace_wpm, 450);
}

#[tokio::test]
async fn controls_need_a_session() {
    let (_store, mut lifecycle) = setup(&words(5)).await;
    assert_eq!(lifecycle.play().await, Err(ReaderError::NoActiveSession));
    assert_eq!(
        lifecycle.request_exit(CloseIntent::Control).await,
        Err(ReaderError::NoActiveSession)
    );
}

#[tokio::test]
async fn empty_text_cannot_play() {
    let (_store, mut lifecycle) = setup("   \n\t ").await;
    let snapshot = lifecycle.start(DOC).await.unwrap();
    assert_eq!(snapshot.total_units, 0);
    assert_eq!(lifecycle.play().await, Err(ReaderError::EmptyContent));
}

#[tokio::test(start_paused = true)]
async fn quick_instruction_dismissal_is_flagged() {
    let store = Arc::new(MemoryStore::new());
    store.insert_text(DOC, words(40)).await;
    let telemetry = Arc::new(MemoryTelemetry::new());
    let mut lifecycle = SessionLifecycle::new(
        EngineConfig::default(),
        SessionStores::from_memory(store).with_telemetry(telemetry.clone()),
    );
    lifecycle.start(DOC).await.unwrap();
    assert!(!lifecycle.check_instruction_skip().unwrap());

    let shown = chrono::Utc::now();
    lifecycle.mark_instructions_shown(shown).unwrap();
    lifecycle
        .record_interaction(RawInput::KeyDown {
            key: " ".to_string(),
            timestamp: shown + chrono::Duration::milliseconds(400),
            repeat: false,
        })
        .unwrap();

    assert!(lifecycle.check_instruction_skip().unwrap());
    assert!(lifecycle.check_instruction_skip().unwrap());
    let skips = telemetry
        .indicators()
        .iter()
        .filter(|(_, i)| i.kind == CheatKind::InstructionSkip)
        .count();
    assert_eq!(skips, 1);
}

#[tokio::test(start_paused = true)]
async fn strong_early_comprehension_unlocks_fast_track_once() {
    let (_store, mut lifecycle) = setup(&words(40)).await;
    lifecycle.start(DOC).await.unwrap();

    assert!(lifecycle.record_comprehension(0.9).await.unwrap());
    assert!(!lifecycle.record_comprehension(0.95).await.unwrap());

    let state = lifecycle.tracker_state();
    assert!(state.fast_track);
    assert_eq!(state.total_recorded, 2);
}

#[derive(Default)]
struct RecordingOutput {
    starts: AtomicU32,
    stops: AtomicU32,
}

impl AmbientOutput for RecordingOutput {
    fn start(&self) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_volume(&self, _volume: f32) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn with_audio(text: &str) -> (Arc<RecordingOutput>, SessionLifecycle) {
    let store = Arc::new(MemoryStore::new());
    store.insert_text(DOC, text).await;
    let output = Arc::new(RecordingOutput::default());
    let lifecycle = SessionLifecycle::new(
        EngineConfig {
            pace_wpm: 600,
            ambient_audio: AmbientAudioConfig {
                enabled: true,
                fade_ms: 400,
                fade_steps: 4,
                ..AmbientAudioConfig::default()
            },
            ..EngineConfig::default()
        },
        SessionStores::from_memory(store),
    )
    .with_audio_output(output.clone());
    (output, lifecycle)
}

#[tokio::test(start_paused = true)]
async fn ghost_close_stops_ambient_audio() {
    let (output, mut lifecycle) = with_audio(&words(40)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(output.starts.load(Ordering::SeqCst), 1);

    let outcome = lifecycle.request_exit(CloseIntent::CancelKey).await.unwrap();
    assert!(matches!(outcome, ExitOutcome::Closed { ghost: true, .. }));
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    assert_eq!(output.stops.load(Ordering::SeqCst), 1);
    assert!(!lifecycle.fader().is_active());
    assert_eq!(lifecycle.fader().level(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn summary_close_stops_ambient_audio() {
    let (output, mut lifecycle) = with_audio(&words(60)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_550)).await;

    let outcome = lifecycle.request_exit(CloseIntent::Control).await.unwrap();
    assert!(matches!(outcome, ExitOutcome::SummaryPending(_)));
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    assert_eq!(output.stops.load(Ordering::SeqCst), 1);
    assert_eq!(lifecycle.fader().level(), 0.0);
    // waiting on the summary does not restart the sound
    assert!(lifecycle.play().await.is_err());
    assert_eq!(output.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_mid_fade_stops_ambient_audio() {
    let (output, mut lifecycle) = with_audio(&words(40)).await;
    lifecycle.start(DOC).await.unwrap();
    lifecycle.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(lifecycle.fader().is_active());

    drop(lifecycle);
    assert!(output.stops.load(Ordering::SeqCst) >= 1);

    let stops = output.stops.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(output.stops.load(Ordering::SeqCst), stops);
}

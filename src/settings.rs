use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::audio::AmbientAudioConfig;
use crate::chunking::{ChunkConfig, ChunkPolicy};
use crate::difficulty::DifficultyConfig;
use crate::performance::{FastTrackThresholds, DEFAULT_SAMPLE_WINDOW};
use crate::presenter::{RhythmConfig, SchedulerConfig};
use crate::sentinel::AntiCheatConfig;

pub const MIN_WPM: u32 = 100;
pub const MAX_WPM: u32 = 2_000;

/// Every tunable of the engine, as stored in the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub chunk_policy: ChunkPolicy,
    /// Pace used when the learner has no history and no override
    pub pace_wpm: u32,
    pub min_wpm: u32,
    pub max_wpm: u32,
    /// Manual pace that wins over the computed difficulty
    pub pace_override: Option<u32>,
    pub zpd_offset: f64,
    pub ghost_session_word_threshold: usize,
    pub sample_window_size: usize,
    pub fast_track: FastTrackThresholds,
    pub anti_cheat: AntiCheatConfig,
    pub seek_step: usize,
    pub rhythm: RhythmConfig,
    /// Ceiling on the pace reported in a session summary
    pub max_session_pace: f64,
    pub progress_debounce_ms: u64,
    pub daily_goal_words: usize,
    pub break_every_words: usize,
    pub ambient_audio: AmbientAudioConfig,
    /// Replaces the built-in linking-word list when set
    pub linking_words: Option<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_policy: ChunkPolicy::Single,
            pace_wpm: 300,
            min_wpm: MIN_WPM,
            max_wpm: MAX_WPM,
            pace_override: None,
            zpd_offset: 0.05,
            ghost_session_word_threshold: 10,
            sample_window_size: DEFAULT_SAMPLE_WINDOW,
            fast_track: FastTrackThresholds::default(),
            anti_cheat: AntiCheatConfig::default(),
            seek_step: 10,
            rhythm: RhythmConfig::default(),
            max_session_pace: 1_000.0,
            progress_debounce_ms: 750,
            daily_goal_words: 2_000,
            break_every_words: 0,
            ambient_audio: AmbientAudioConfig::default(),
            linking_words: None,
        }
    }
}

impl EngineConfig {
    /// Clamps every value into its bounds, warning about each one changed.
    pub fn sanitized(mut self) -> Self {
        self.min_wpm = clamp_logged("minWpm", self.min_wpm, MIN_WPM, MAX_WPM);
        self.max_wpm = clamp_logged("maxWpm", self.max_wpm, self.min_wpm, MAX_WPM);
        self.pace_wpm = clamp_logged("paceWpm", self.pace_wpm, self.min_wpm, self.max_wpm);
        self.pace_override = self
            .pace_override
            .map(|wpm| clamp_logged("paceOverride", wpm, self.min_wpm, self.max_wpm));

        self.zpd_offset = clamp_f64_logged("zpdOffset", self.zpd_offset, 0.0, 1.0);
        self.sample_window_size =
            clamp_logged("sampleWindowSize", self.sample_window_size, 1, 10_000);
        self.seek_step = clamp_logged("seekStep", self.seek_step, 1, 1_000);
        self.max_session_pace = clamp_f64_logged(
            "maxSessionPace",
            self.max_session_pace,
            self.min_wpm as f64,
            MAX_WPM as f64,
        );
        self.progress_debounce_ms =
            clamp_logged("progressDebounceMs", self.progress_debounce_ms, 0, 60_000);

        let fast = &mut self.fast_track;
        fast.pace = clamp_f64_logged("fastTrack.pace", fast.pace, 0.0, MAX_WPM as f64);
        fast.comprehension =
            clamp_f64_logged("fastTrack.comprehension", fast.comprehension, 0.0, 1.0);
        fast.progress_window =
            clamp_f64_logged("fastTrack.progressWindow", fast.progress_window, 0.0, 1.0);

        let guard = &mut self.anti_cheat;
        guard.random_click_threshold = clamp_logged(
            "antiCheat.randomClickThreshold",
            guard.random_click_threshold,
            2,
            1_000,
        );
        guard.pattern_detection_window = clamp_logged(
            "antiCheat.patternDetectionWindow",
            guard.pattern_detection_window,
            3,
            1_000,
        );
        guard.event_window_size = clamp_logged(
            "antiCheat.eventWindowSize",
            guard.event_window_size,
            guard.pattern_detection_window.max(guard.random_click_threshold),
            10_000,
        );
        guard.timing_tolerance =
            clamp_f64_logged("antiCheat.timingTolerance", guard.timing_tolerance, 0.0, 10_000.0);

        let audio = &mut self.ambient_audio;
        audio.volume = clamp_f64_logged("ambientAudio.volume", audio.volume as f64, 0.0, 1.0) as f32;
        audio.fade_steps = clamp_logged("ambientAudio.fadeSteps", audio.fade_steps, 1, 200);

        self
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        self.chunk_config_for(self.chunk_policy)
    }

    /// Chunker settings for `policy`, keeping the configured linking words.
    pub fn chunk_config_for(&self, policy: ChunkPolicy) -> ChunkConfig {
        let config = ChunkConfig::new(policy);
        match &self.linking_words {
            Some(words) => config.with_linking_words(words),
            None => config,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            default_wpm: self.pace_wpm,
            min_wpm: self.min_wpm,
            max_wpm: self.max_wpm,
            seek_step: self.seek_step,
            break_every_words: self.break_every_words,
            rhythm: self.rhythm.clone(),
        }
    }

    pub fn difficulty_config(&self) -> DifficultyConfig {
        DifficultyConfig {
            zpd_offset: self.zpd_offset,
            ..DifficultyConfig::default()
        }
    }
}

fn clamp_logged<T>(key: &str, value: T, min: T, max: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    let max = if max < min { min } else { max };
    let clamped = if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    };
    if clamped != value {
        warn!("config {key}={value} out of range, using {clamped}");
    }
    clamped
}

fn clamp_f64_logged(key: &str, value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        warn!("config {key} is not a number, using {min}");
        return min;
    }
    clamp_logged(key, value, min, max)
}

/// Engine settings persisted as pretty JSON.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineConfig>,
}

impl SettingsStore {
    /// Loads `path`. A missing or corrupt file yields defaults; a file that
    /// exists but cannot be read is an error.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<EngineConfig>(&contents) {
                Ok(config) => config.sanitized(),
                Err(err) => {
                    warn!(
                        "settings at {} are corrupt, using defaults: {err}",
                        path.display()
                    );
                    EngineConfig::default()
                }
            }
        } else {
            EngineConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn config(&self) -> EngineConfig {
        self.read().clone()
    }

    /// Sanitizes, stores and persists `config`, returning what was kept.
    pub fn update(&self, config: EngineConfig) -> Result<EngineConfig> {
        let config = config.sanitized();
        let mut guard = self.write();
        self.persist(&config)?;
        *guard = config.clone();
        Ok(config)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: EngineConfig = serde_json::from_str(&contents)?;
        *self.write() = data.sanitized();
        Ok(())
    }

    fn persist(&self, data: &EngineConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineConfig> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineConfig> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

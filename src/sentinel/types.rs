use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionKind {
    Click,
    Scroll,
    Keypress,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub timestamp: DateTime<Utc>,
    pub position: Option<Position>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheatKind {
    RandomClicking,
    PatternAutomation,
    TimingAnomaly,
    InstructionSkip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Advisory finding; nothing in the engine blocks on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheatIndicator {
    pub kind: CheatKind,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AntiCheatConfig {
    /// Clicks needed before dispersion is judged
    pub random_click_threshold: usize,
    /// Events considered by the automation check
    pub pattern_detection_window: usize,
    /// Interval spread (ms) below which a rhythm counts as machine-regular
    pub timing_tolerance: f64,
    /// Minimum ms a learner should spend on instructions
    pub instruction_skip_window: u64,
    /// Rolling event window capacity
    pub event_window_size: usize,
    /// Intervals shorter than this (ms) are not humanly possible
    pub min_human_interval_ms: f64,
    pub dispersion_threshold: f64,
    pub variation_threshold: f64,
}

impl Default for AntiCheatConfig {
    fn default() -> Self {
        Self {
            random_click_threshold: 5,
            pattern_detection_window: 10,
            timing_tolerance: 50.0,
            instruction_skip_window: 2_000,
            event_window_size: 100,
            min_human_interval_ms: 50.0,
            dispersion_threshold: 0.8,
            variation_threshold: 0.1,
        }
    }
}

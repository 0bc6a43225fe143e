use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingMetricSample {
    /// Words per minute at the time of the sample
    pub pace: f64,
    pub comprehension_rate: f64,
    pub session_progress: f64,
    pub timestamp: DateTime<Utc>,
}

impl ReadingMetricSample {
    pub fn new(pace: f64, comprehension_rate: f64, session_progress: f64) -> Self {
        Self {
            pace,
            comprehension_rate,
            session_progress,
            timestamp: Utc::now(),
        }
    }

    /// Pulls out-of-range inputs back into their domains.
    pub(crate) fn clamped(mut self) -> Self {
        self.pace = if self.pace.is_finite() { self.pace.max(0.0) } else { 0.0 };
        self.comprehension_rate = unit_interval(self.comprehension_rate);
        self.session_progress = unit_interval(self.session_progress);
        self
    }
}

fn unit_interval(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Thresholds a learner must meet early in a session to unlock fast-track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FastTrackThresholds {
    pub pace: f64,
    pub comprehension: f64,
    /// Fraction of the session counted as "early"
    pub progress_window: f64,
}

impl Default for FastTrackThresholds {
    fn default() -> Self {
        Self {
            pace: 350.0,
            comprehension: 0.85,
            progress_window: 0.10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    pub samples: Vec<ReadingMetricSample>,
    pub fast_track: bool,
    pub average_pace: Option<f64>,
    pub average_comprehension: Option<f64>,
    /// Samples seen since the last reset, including evicted ones
    pub total_recorded: u64,
}

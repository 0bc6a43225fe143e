mod types;

pub use types::{FastTrackThresholds, ReadingMetricSample, TrackerState};

use std::collections::VecDeque;

use log::{debug, info};

pub const DEFAULT_SAMPLE_WINDOW: usize = 50;

/// Rolling window of reading samples for the running session.
///
/// `reset()` belongs at session start so nothing leaks from the previous one.
pub struct PerformanceTracker {
    capacity: usize,
    thresholds: FastTrackThresholds,
    samples: VecDeque<ReadingMetricSample>,
    fast_track: bool,
    total_recorded: u64,
}

impl PerformanceTracker {
    pub fn new(capacity: usize, thresholds: FastTrackThresholds) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            thresholds,
            samples: VecDeque::with_capacity(capacity),
            fast_track: false,
            total_recorded: 0,
        }
    }

    /// Appends a sample, evicting the oldest at capacity. Returns `true` when
    /// this sample is the one that unlocked fast-track.
    pub fn record_metric(&mut self, sample: ReadingMetricSample) -> bool {
        self.samples.push_back(sample.clamped());
        self.total_recorded += 1;

        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        if !self.fast_track && self.check_fast_track_eligibility() {
            return self.trigger_fast_track();
        }
        false
    }

    /// Whether the early part of the session meets both thresholds. Too few
    /// early samples means "not eligible", never an error.
    pub fn check_fast_track_eligibility(&self) -> bool {
        let early: Vec<&ReadingMetricSample> = self
            .samples
            .iter()
            .filter(|s| s.session_progress <= self.thresholds.progress_window)
            .collect();

        if early.is_empty() {
            return false;
        }

        let count = early.len() as f64;
        let avg_pace = early.iter().map(|s| s.pace).sum::<f64>() / count;
        let avg_comprehension = early.iter().map(|s| s.comprehension_rate).sum::<f64>() / count;
        debug!(
            "fast-track check: {} early samples, pace {:.1}, comprehension {:.2}",
            early.len(),
            avg_pace,
            avg_comprehension
        );

        avg_pace >= self.thresholds.pace && avg_comprehension >= self.thresholds.comprehension
    }

    /// Latches the fast-track flag. Returns `true` only on the first call
    /// since the last reset.
    pub fn trigger_fast_track(&mut self) -> bool {
        if self.fast_track {
            return false;
        }
        self.fast_track = true;
        info!("fast-track unlocked after {} samples", self.total_recorded);
        true
    }

    pub fn is_fast_track(&self) -> bool {
        self.fast_track
    }

    pub fn average_pace(&self) -> Option<f64> {
        self.average(|s| s.pace)
    }

    pub fn average_comprehension(&self) -> Option<f64> {
        self.average(|s| s.comprehension_rate)
    }

    fn average(&self, field: impl Fn(&ReadingMetricSample) -> f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().map(field).sum::<f64>() / self.samples.len() as f64)
    }

    pub fn get_state(&self) -> TrackerState {
        TrackerState {
            samples: self.samples.iter().cloned().collect(),
            fast_track: self.fast_track,
            average_pace: self.average_pace(),
            average_comprehension: self.average_comprehension(),
            total_recorded: self.total_recorded,
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.fast_track = false;
        self.total_recorded = 0;
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW, FastTrackThresholds::default())
    }
}

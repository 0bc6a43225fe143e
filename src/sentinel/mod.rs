pub mod analysis;
mod types;

pub use types::{
    AntiCheatConfig, CheatIndicator, CheatKind, InteractionEvent, InteractionKind, Position,
    Severity,
};

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use analysis::{detect_pattern_automation, detect_random_clicking, detect_timing_anomaly};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Watches interaction timing and placement for automation or disengagement.
///
/// Findings are advisory telemetry: nothing here pauses, blocks or penalizes
/// the reader, so a fast but legitimate learner is never interrupted.
pub struct InteractionSentinel {
    config: AntiCheatConfig,
    events: VecDeque<InteractionEvent>,
}

impl InteractionSentinel {
    pub fn new(config: AntiCheatConfig) -> Self {
        let capacity = config.event_window_size.max(2);
        Self {
            config,
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn config(&self) -> &AntiCheatConfig {
        &self.config
    }

    pub fn record_interaction(&mut self, event: InteractionEvent) {
        self.events.push_back(event);
        while self.events.len() > self.config.event_window_size.max(2) {
            self.events.pop_front();
        }
    }

    /// Runs every check over the current window. Too little data yields no
    /// indicator rather than an error.
    pub fn analyze_pattern(&self) -> Vec<CheatIndicator> {
        let events: Vec<InteractionEvent> = self.events.iter().cloned().collect();

        let indicators: Vec<CheatIndicator> = [
            detect_random_clicking(&events, &self.config),
            detect_pattern_automation(&events, &self.config),
            detect_timing_anomaly(&events, &self.config),
        ]
        .into_iter()
        .flatten()
        .collect();

        if !indicators.is_empty() {
            log_info!(
                "interaction sentinel raised {} indicator(s) over {} events",
                indicators.len(),
                events.len()
            );
        }
        indicators
    }

    /// True when the learner's first interaction after the instructions
    /// appeared came sooner than the configured reading window.
    pub fn check_instruction_skip(&self, instruction_timestamp: DateTime<Utc>) -> bool {
        let first = self
            .events
            .iter()
            .filter(|e| e.timestamp >= instruction_timestamp)
            .map(|e| e.timestamp)
            .min();

        match first {
            Some(at) => {
                let window = Duration::milliseconds(self.config.instruction_skip_window as i64);
                let skipped = at - instruction_timestamp < window;
                if skipped {
                    log_debug!(
                        "instructions dismissed after {}ms",
                        (at - instruction_timestamp).num_milliseconds()
                    );
                }
                skipped
            }
            None => false,
        }
    }

    pub fn instruction_skip_indicator(
        &self,
        instruction_timestamp: DateTime<Utc>,
    ) -> Option<CheatIndicator> {
        if !self.check_instruction_skip(instruction_timestamp) {
            return None;
        }
        Some(CheatIndicator {
            kind: CheatKind::InstructionSkip,
            severity: Severity::Low,
            timestamp: Utc::now(),
            evidence: vec![format!("window_ms={}", self.config.instruction_skip_window)],
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &InteractionEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn reset(&mut self) {
        self.events.clear();
    }
}

impl Default for InteractionSentinel {
    fn default() -> Self {
        Self::new(AntiCheatConfig::default())
    }
}

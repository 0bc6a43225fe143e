mod types;

pub use types::{
    DifficultyConfig, DifficultyLevel, PerformanceFeedback, QuestionComplexity, TextComplexity,
};

use log::debug;

use crate::models::CapabilityProfile;

/// Maps proven capability to a target one notch above it (zone of proximal
/// development). Every operation is pure and total.
#[derive(Debug, Clone, Default)]
pub struct DifficultyScaler {
    config: DifficultyConfig,
}

impl DifficultyScaler {
    pub fn new(config: DifficultyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DifficultyConfig {
        &self.config
    }

    pub fn calculate_difficulty(&self, capability: &CapabilityProfile) -> DifficultyLevel {
        let pace = sanitize_pace(capability.max_sustained_pace) * (1.0 + self.config.zpd_offset);
        self.level_from_pace(pace, 0)
    }

    /// Base calculation with a wider offset and one extra level of headroom,
    /// for learners the tracker flagged.
    pub fn get_fast_track_difficulty(&self, capability: &CapabilityProfile) -> DifficultyLevel {
        let pace =
            sanitize_pace(capability.max_sustained_pace) * (1.0 + self.config.fast_track_offset);
        self.level_from_pace(pace, 1)
    }

    pub fn adjust_difficulty(
        &self,
        current: &DifficultyLevel,
        feedback: &PerformanceFeedback,
    ) -> DifficultyLevel {
        let level = current.level as i16;
        let next = if feedback.success_rate > 0.9 && feedback.comprehension > 0.85 {
            level + 1
        } else if feedback.success_rate < 0.7 || feedback.comprehension < 0.6 {
            level - 1
        } else {
            level
        };
        let next = self.clamp_level(next);

        let pace_target = if next == current.level {
            current.pace_target
        } else {
            self.pace_for_level(next)
        };
        debug!("difficulty {} -> {} (pace {})", current.level, next, pace_target);

        DifficultyLevel {
            level: next,
            pace_target,
            text_complexity: TextComplexity::for_level(next),
            question_complexity: QuestionComplexity::for_level(next),
        }
    }

    /// Level a pace falls on, over the configured pace range.
    pub fn level_for_pace(&self, pace: f64) -> u8 {
        let (min, max) = (self.config.min_pace, self.config.max_pace);
        let span = (max - min).max(f64::EPSILON);
        let steps = (self.config.max_level - self.config.min_level) as f64;
        let clamped = sanitize_pace(pace).clamp(min, max);
        let level = self.config.min_level as f64 + steps * (clamped - min) / span;
        self.clamp_level(level.round() as i16)
    }

    /// Inverse of `level_for_pace`: the pace at which a level starts.
    pub fn pace_for_level(&self, level: u8) -> u32 {
        let level = self.clamp_level(level as i16);
        let steps = (self.config.max_level - self.config.min_level).max(1) as f64;
        let fraction = (level - self.config.min_level) as f64 / steps;
        let pace = self.config.min_pace + fraction * (self.config.max_pace - self.config.min_pace);
        pace.round() as u32
    }

    /// Folds a confirmed session into the learner's profile.
    pub fn update_profile(
        &self,
        profile: &CapabilityProfile,
        session_pace: f64,
        comprehension: Option<f64>,
        fast_track: bool,
    ) -> CapabilityProfile {
        let alpha = self.config.profile_smoothing.clamp(0.0, 1.0);
        let pace = sanitize_pace(session_pace);
        let mut next = profile.clone();

        next.current_pace = if profile.has_history() {
            profile.current_pace * (1.0 - alpha) + pace * alpha
        } else {
            pace
        };

        if let Some(score) = comprehension.map(|c| c.clamp(0.0, 1.0)) {
            next.comprehension_score = if profile.has_history() {
                profile.comprehension_score * (1.0 - alpha) + score * alpha
            } else {
                score
            };
        }

        let sustained = comprehension
            .map(|c| c >= self.config.sustained_comprehension_floor)
            .unwrap_or(true);
        if sustained && pace > profile.max_sustained_pace {
            next.max_sustained_pace = pace;
        }

        next.session_count = profile.session_count.saturating_add(1);
        next.fast_track = fast_track;
        next
    }

    fn level_from_pace(&self, pace: f64, headroom: i16) -> DifficultyLevel {
        let base = self.level_for_pace(pace);
        let level = self.clamp_level(base as i16 + headroom);
        DifficultyLevel {
            level,
            pace_target: pace.round() as u32,
            text_complexity: TextComplexity::for_level(level),
            question_complexity: QuestionComplexity::for_level(level),
        }
    }

    fn clamp_level(&self, level: i16) -> u8 {
        level.clamp(self.config.min_level as i16, self.config.max_level as i16) as u8
    }
}

fn sanitize_pace(pace: f64) -> f64 {
    if pace.is_finite() {
        pace.max(0.0)
    } else {
        0.0
    }
}

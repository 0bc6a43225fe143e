use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextComplexity {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl TextComplexity {
    pub fn for_level(level: u8) -> Self {
        match level {
            0..=3 => TextComplexity::Beginner,
            4..=6 => TextComplexity::Intermediate,
            7..=8 => TextComplexity::Advanced,
            _ => TextComplexity::Expert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionComplexity {
    Simple,
    Moderate,
    Complex,
    Analytical,
}

impl QuestionComplexity {
    pub fn for_level(level: u8) -> Self {
        match level {
            0..=2 => QuestionComplexity::Simple,
            3..=5 => QuestionComplexity::Moderate,
            6..=8 => QuestionComplexity::Complex,
            _ => QuestionComplexity::Analytical,
        }
    }
}

/// Derived difficulty; recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyLevel {
    pub level: u8,
    /// Target pace in words per minute
    pub pace_target: u32,
    pub text_complexity: TextComplexity,
    pub question_complexity: QuestionComplexity,
}

/// Outcome of a batch of comprehension checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceFeedback {
    pub success_rate: f64,
    pub comprehension: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifficultyConfig {
    /// How far above proven capability the target sits
    pub zpd_offset: f64,
    pub fast_track_offset: f64,
    pub min_pace: f64,
    pub max_pace: f64,
    pub min_level: u8,
    pub max_level: u8,
    /// Weight of the newest session in the profile's moving averages
    pub profile_smoothing: f64,
    /// Sessions below this comprehension never raise `max_sustained_pace`
    pub sustained_comprehension_floor: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            zpd_offset: 0.05,
            fast_track_offset: 0.10,
            min_pace: 50.0,
            max_pace: 400.0,
            min_level: 1,
            max_level: 10,
            profile_smoothing: 0.3,
            sustained_comprehension_floor: 0.6,
        }
    }
}

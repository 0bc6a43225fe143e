use serde::{Deserialize, Serialize};

/// Long-lived reading capability of a learner.
///
/// Read once when a session starts and written back only after the learner
/// confirms the end-of-session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilityProfile {
    pub current_pace: f64,
    pub max_sustained_pace: f64,
    pub comprehension_score: f64,
    pub session_count: u32,
    /// Pace the learner pinned manually; overrides the computed target.
    pub preferred_pace: Option<u32>,
    /// Set when the previous confirmed session unlocked fast-track.
    pub fast_track: bool,
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        Self {
            current_pace: 0.0,
            max_sustained_pace: 0.0,
            comprehension_score: 0.0,
            session_count: 0,
            preferred_pace: None,
            fast_track: false,
        }
    }
}

impl CapabilityProfile {
    pub fn has_history(&self) -> bool {
        self.session_count > 0
    }
}

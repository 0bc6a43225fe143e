use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::TextUnit;

/// Per-unit delay modifiers for the single-word timing path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RhythmConfig {
    pub enabled: bool,
    pub sentence_multiplier: f64, // default 2.5x
    pub clause_multiplier: f64,   // default 1.5x
    pub long_unit_chars: usize,
    pub long_unit_bonus: f64, // +0.5x above long_unit_chars
    pub short_unit_chars: usize,
    pub short_unit_discount: f64, // -0.1x below short_unit_chars
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sentence_multiplier: 2.5,
            clause_multiplier: 1.5,
            long_unit_chars: 12,
            long_unit_bonus: 0.5,
            short_unit_chars: 3,
            short_unit_discount: 0.1,
        }
    }
}

impl RhythmConfig {
    pub fn multiplier(&self, unit: &TextUnit) -> f64 {
        let mut factor = if unit.ends_sentence {
            self.sentence_multiplier
        } else if unit.ends_clause {
            self.clause_multiplier
        } else {
            1.0
        };

        if unit.length_chars > self.long_unit_chars {
            factor += self.long_unit_bonus;
        } else if unit.length_chars < self.short_unit_chars {
            factor -= self.short_unit_discount;
        }
        factor.max(0.1)
    }
}

/// Milliseconds one word is shown at `pace_wpm`.
pub fn word_interval_ms(pace_wpm: u32) -> f64 {
    60_000.0 / pace_wpm.max(1) as f64
}

/// How long `unit` stays on screen: one word interval per word, stretched by
/// the rhythm modifiers when single-word timing is active.
pub fn unit_delay(unit: &TextUnit, pace_wpm: u32, rhythm: Option<&RhythmConfig>) -> Duration {
    let mut ms = word_interval_ms(pace_wpm) * unit.word_count.max(1) as f64;
    if let Some(rhythm) = rhythm.filter(|r| r.enabled) {
        ms *= rhythm.multiplier(unit);
    }
    Duration::from_micros((ms * 1_000.0).round() as u64)
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Words-per-day target and today's tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGoal {
    pub date: NaiveDate,
    pub target_words: usize,
    pub words_today: usize,
    pub sessions_today: u32,
    pub completed: bool,
    /// Confirmed sessions already counted today
    #[serde(default)]
    pub counted_sessions: Vec<String>,
}

impl DailyGoal {
    pub fn new(date: NaiveDate, target_words: usize) -> Self {
        Self {
            date,
            target_words,
            words_today: 0,
            sessions_today: 0,
            completed: false,
            counted_sessions: Vec::new(),
        }
    }

    pub fn remaining_words(&self) -> usize {
        self.target_words.saturating_sub(self.words_today)
    }
}

use chrono::NaiveDate;

use crate::models::DailyGoal;

/// Counts confirmed reading toward a words-per-day goal.
#[derive(Debug, Clone)]
pub struct DailyGoalTracker {
    goal: DailyGoal,
}

impl DailyGoalTracker {
    pub fn new(target_words: usize, today: NaiveDate) -> Self {
        Self {
            goal: DailyGoal::new(today, target_words),
        }
    }

    /// Resumes a stored goal, starting fresh if it belongs to another day.
    pub fn resume(saved: Option<DailyGoal>, target_words: usize, today: NaiveDate) -> Self {
        let mut tracker = match saved {
            Some(goal) => Self { goal },
            None => Self::new(target_words, today),
        };
        tracker.goal.target_words = target_words;
        tracker.roll_over(today);
        tracker
    }

    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.goal.date != today {
            self.goal = DailyGoal::new(today, self.goal.target_words);
        }
        self.goal.completed = self.goal.target_words > 0 && self.goal.words_today >= self.goal.target_words;
    }

    /// Adds a confirmed session. Each session id counts once; returns false
    /// for a repeat.
    pub fn record_session(&mut self, session_id: &str, words: usize, today: NaiveDate) -> bool {
        self.roll_over(today);
        if self.goal.counted_sessions.iter().any(|id| id == session_id) {
            return false;
        }
        self.goal.counted_sessions.push(session_id.to_string());
        self.goal.words_today += words;
        self.goal.sessions_today += 1;
        self.goal.completed = self.goal.target_words > 0 && self.goal.words_today >= self.goal.target_words;
        true
    }

    pub fn goal(&self) -> &DailyGoal {
        &self.goal
    }

    pub fn into_goal(self) -> DailyGoal {
        self.goal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn session_counts_once() {
        let mut tracker = DailyGoalTracker::new(100, day(1));
        assert!(tracker.record_session("s1", 60, day(1)));
        assert!(!tracker.record_session("s1", 60, day(1)));
        assert_eq!(tracker.goal().words_today, 60);
        assert!(!tracker.goal().completed);
        assert_eq!(tracker.goal().remaining_words(), 40);

        assert!(tracker.record_session("s2", 45, day(1)));
        assert_eq!(tracker.goal().sessions_today, 2);
        assert!(tracker.goal().completed);
        assert_eq!(tracker.goal().remaining_words(), 0);
    }

    #[test]
    fn new_day_starts_from_zero() {
        let mut tracker = DailyGoalTracker::new(100, day(1));
        tracker.record_session("s1", 150, day(1));

        let resumed = DailyGoalTracker::resume(Some(tracker.into_goal()), 100, day(2));
        assert_eq!(resumed.goal().date, day(2));
        assert_eq!(resumed.goal().words_today, 0);
        assert!(!resumed.goal().completed);
    }
}

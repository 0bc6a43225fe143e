use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chunking::{remap_cursor, unit_at_word, TextUnit};
use crate::error::ReaderError;

use super::rhythm::{unit_delay, RhythmConfig};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PresenterStatus {
    #[default]
    Idle,
    Playing,
    Paused,
    /// Guided break; seeking is locked until it finishes
    Interlude,
    Ended,
}

/// Result of delivering a timer tick to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belongs to a cancelled arm or the reader is not playing.
    Stale,
    Advanced { next_delay: Duration },
    /// Cursor reached the end for the first time.
    Completed,
    /// Automatic guided break after enough words.
    Interlude,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub default_wpm: u32,
    pub min_wpm: u32,
    pub max_wpm: u32,
    /// Units moved by one manual seek
    pub seek_step: usize,
    /// Words between automatic guided breaks, 0 disables them
    pub break_every_words: usize,
    pub rhythm: RhythmConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_wpm: 300,
            min_wpm: 100,
            max_wpm: 2_000,
            seek_step: 10,
            break_every_words: 0,
            rhythm: RhythmConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn clamp_wpm(&self, wpm: u32) -> u32 {
        wpm.clamp(self.min_wpm, self.max_wpm.max(self.min_wpm))
    }
}

/// The presentation session: unit sequence, cursor and pace.
///
/// Pure state machine. Timers live in the controller; every armed tick
/// carries the `epoch` it was issued under and any transition bumps the
/// epoch, so a tick that outlives its arm can never move the cursor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationState {
    pub status: PresenterStatus,
    pub units: Vec<TextUnit>,
    pub cursor: usize,
    pub start_cursor: usize,
    pub pace_wpm: u32,
    pub started_at: Option<DateTime<Utc>>,
    /// Single-word timing path: rhythm modifiers apply
    pub single_word_timing: bool,
    #[serde(skip)]
    epoch: u64,
    #[serde(skip)]
    completion_fired: bool,
    #[serde(skip)]
    words_since_break: usize,
    /// Word offset reading began at; survives re-chunking exactly
    #[serde(skip)]
    start_word: usize,
    /// `word_prefix[i]` = words in `units[..i]`
    #[serde(skip)]
    word_prefix: Vec<usize>,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self {
            status: PresenterStatus::Idle,
            units: Vec::new(),
            cursor: 0,
            start_cursor: 0,
            pace_wpm: SchedulerConfig::default().default_wpm,
            started_at: None,
            single_word_timing: true,
            epoch: 0,
            completion_fired: false,
            words_since_break: 0,
            start_word: 0,
            word_prefix: vec![0],
        }
    }
}

impl PresentationState {
    pub fn new(pace_wpm: u32) -> Self {
        Self {
            pace_wpm,
            ..Self::default()
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn current_unit(&self) -> Option<&TextUnit> {
        self.units.get(self.cursor)
    }

    pub fn progress(&self) -> f64 {
        if self.units.is_empty() {
            0.0
        } else {
            self.cursor as f64 / self.units.len() as f64
        }
    }

    /// Words in the units before `cursor`.
    pub fn word_offset(&self, cursor: usize) -> usize {
        self.word_prefix[cursor.min(self.units.len())]
    }

    pub fn total_words(&self) -> usize {
        self.word_offset(self.units.len())
    }

    /// Words traversed since reading began; 0 when the reader seeked back past it.
    pub fn words_read(&self) -> usize {
        self.word_offset(self.cursor).saturating_sub(self.start_word)
    }

    pub fn units_read(&self) -> usize {
        self.cursor.saturating_sub(self.start_cursor)
    }

    pub fn completion_fired(&self) -> bool {
        self.completion_fired
    }

    /// Replaces the sequence and places the cursor at `cursor` (clamped).
    pub fn load(&mut self, units: Vec<TextUnit>, cursor: usize, single_word_timing: bool) {
        self.invalidate();
        self.word_prefix = prefix_sums(&units);
        self.units = units;
        self.cursor = cursor.min(self.units.len());
        self.start_cursor = self.cursor;
        self.start_word = self.word_offset(self.cursor);
        self.single_word_timing = single_word_timing;
        self.status = PresenterStatus::Idle;
        self.completion_fired = false;
        self.words_since_break = 0;
        self.started_at = None;
    }

    /// Swaps in a re-chunked sequence, keeping the cursor's relative position.
    /// The start stays pinned to its word so `words_read` does not drift.
    pub fn replace_units(&mut self, units: Vec<TextUnit>, single_word_timing: bool) {
        self.invalidate();
        let (old_len, new_len) = (self.units.len(), units.len());
        self.cursor = remap_cursor(self.cursor, old_len, new_len);
        self.start_cursor = unit_at_word(&units, self.start_word);
        self.word_prefix = prefix_sums(&units);
        self.units = units;
        self.single_word_timing = single_word_timing;

        if self.cursor >= self.units.len() && self.status == PresenterStatus::Playing {
            self.status = PresenterStatus::Paused;
        }
    }

    /// `Idle`/`Paused` -> `Playing`. Needs a non-empty sequence with units left.
    pub fn play(&mut self) -> Result<bool, ReaderError> {
        if self.units.is_empty() {
            return Err(ReaderError::EmptyContent);
        }
        match self.status {
            PresenterStatus::Playing => Ok(false),
            PresenterStatus::Interlude | PresenterStatus::Ended => Ok(false),
            PresenterStatus::Idle | PresenterStatus::Paused => {
                if self.cursor >= self.units.len() {
                    return Ok(false);
                }
                self.invalidate();
                self.status = PresenterStatus::Playing;
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
                Ok(true)
            }
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.status != PresenterStatus::Playing {
            return false;
        }
        self.invalidate();
        self.status = PresenterStatus::Paused;
        true
    }

    pub fn enter_interlude(&mut self) -> bool {
        match self.status {
            PresenterStatus::Playing | PresenterStatus::Paused => {
                self.invalidate();
                self.status = PresenterStatus::Interlude;
                self.words_since_break = 0;
                true
            }
            _ => false,
        }
    }

    pub fn finish_interlude(&mut self) -> bool {
        if self.status != PresenterStatus::Interlude {
            return false;
        }
        self.invalidate();
        self.status = PresenterStatus::Paused;
        true
    }

    /// Moves the cursor by `delta` units, pausing first. Not allowed during
    /// an interlude.
    pub fn seek(&mut self, delta: isize) -> Result<usize, ReaderError> {
        if self.status == PresenterStatus::Interlude {
            return Err(ReaderError::SeekDuringInterlude);
        }
        self.invalidate();
        if self.status == PresenterStatus::Playing {
            self.status = PresenterStatus::Paused;
        }

        let len = self.units.len() as isize;
        self.cursor = (self.cursor as isize).saturating_add(delta).clamp(0, len) as usize;

        if self.status == PresenterStatus::Ended && self.cursor < self.units.len() {
            self.status = PresenterStatus::Paused;
        }
        Ok(self.cursor)
    }

    /// Any state -> `Idle` with the cursor back at 0.
    pub fn reset(&mut self) {
        self.invalidate();
        self.status = PresenterStatus::Idle;
        self.cursor = 0;
        self.start_cursor = 0;
        self.start_word = 0;
        self.completion_fired = false;
        self.words_since_break = 0;
        self.started_at = None;
    }

    pub fn set_pace(&mut self, wpm: u32) {
        self.pace_wpm = wpm.max(1);
    }

    /// Issues a new arm: bumps the epoch and, when playing with units left,
    /// returns the epoch and delay for the next tick.
    pub fn arm(&mut self, rhythm: &RhythmConfig) -> Option<(u64, Duration)> {
        self.invalidate();
        if self.status != PresenterStatus::Playing {
            return None;
        }
        let delay = self.current_delay(rhythm)?;
        Some((self.epoch, delay))
    }

    pub fn current_delay(&self, rhythm: &RhythmConfig) -> Option<Duration> {
        let unit = self.current_unit()?;
        let rhythm = self.single_word_timing.then_some(rhythm);
        Some(unit_delay(unit, self.pace_wpm, rhythm))
    }

    /// Delivers a tick issued under `epoch`. The current unit's display time
    /// is over, so the cursor moves on by one unit.
    pub fn on_tick(&mut self, epoch: u64, config: &SchedulerConfig) -> TickOutcome {
        if epoch != self.epoch || self.status != PresenterStatus::Playing {
            return TickOutcome::Stale;
        }

        let shown_words = self.current_unit().map(|u| u.word_count).unwrap_or(0);
        self.cursor = (self.cursor + 1).min(self.units.len());
        self.words_since_break += shown_words;

        if self.cursor >= self.units.len() {
            self.invalidate();
            self.status = PresenterStatus::Ended;
            if self.completion_fired {
                return TickOutcome::Stale;
            }
            self.completion_fired = true;
            return TickOutcome::Completed;
        }

        if config.break_every_words > 0 && self.words_since_break >= config.break_every_words {
            self.enter_interlude();
            return TickOutcome::Interlude;
        }

        match self.current_delay(&config.rhythm) {
            Some(next_delay) => TickOutcome::Advanced { next_delay },
            None => TickOutcome::Stale,
        }
    }

    fn invalidate(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}

fn prefix_sums(units: &[TextUnit]) -> Vec<usize> {
    let mut prefix = Vec::with_capacity(units.len() + 1);
    let mut total = 0;
    prefix.push(0);
    for unit in units {
        total += unit.word_count;
        prefix.push(total);
    }
    prefix
}

use tracing::debug;

use crate::practice::{PracticeSource, PracticeStart, TextSource};
use crate::session::{SessionStats, SessionSummary};
use crate::stats::{RollingWpmTracker, TypingEvent, WpmDisplay, WpmDisplayPolicy};

/// Refill when fewer than this many characters remain ahead of the cursor.
pub const DEFAULT_REFILL_MARGIN: usize = 1_700;
/// Characters added per refill.
pub const DEFAULT_REFILL_STEP: usize = 4_000;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Input {
    pub char: char,
    pub outcome: Outcome,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrillSettings {
    pub refill_margin: usize,
    pub refill_step: usize,
    /// Session length in milliseconds from the first keystroke; `None` runs
    /// until the user stops.
    pub time_limit_ms: Option<u64>,
    pub wpm_policy: WpmDisplayPolicy,
}

impl Default for DrillSettings {
    fn default() -> Self {
        Self {
            refill_margin: DEFAULT_REFILL_MARGIN,
            refill_step: DEFAULT_REFILL_STEP,
            time_limit_ms: None,
            wpm_policy: WpmDisplayPolicy::default(),
        }
    }
}

/// One endless typing session over a practice source.
#[derive(Debug)]
pub struct Drill {
    source: PracticeSource,
    target: Vec<char>,
    /// Spaces before this index have already counted as completed words.
    words_completed_upto: usize,
    pub input: Vec<Input>,
    pub stats: SessionStats,
    tracker: RollingWpmTracker,
    settings: DrillSettings,
    finished_at: Option<u64>,
}

impl Drill {
    pub fn new(start: PracticeStart, settings: DrillSettings) -> Self {
        Self {
            source: start.source,
            target: start.text.chars().collect(),
            words_completed_upto: 0,
            input: vec![],
            stats: SessionStats::default(),
            tracker: RollingWpmTracker::new(settings.wpm_policy),
            settings,
            finished_at: None,
        }
    }

    pub fn source(&self) -> &PracticeSource {
        &self.source
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn cursor_pos(&self) -> usize {
        self.input.len()
    }

    pub fn expected_char(&self) -> Option<char> {
        self.target.get(self.cursor_pos()).copied()
    }

    pub fn remaining(&self) -> usize {
        self.target.len().saturating_sub(self.cursor_pos())
    }

    pub fn wpm(&self) -> WpmDisplay {
        self.tracker.display()
    }

    pub fn write(&mut self, c: char, now: u64) {
        if self.has_finished() {
            return;
        }
        let Some(expected) = self.expected_char() else {
            return;
        };

        let outcome = if c == expected {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        let correct = outcome == Outcome::Correct;

        self.stats.record_keystroke(now, correct);
        self.tracker
            .record(TypingEvent::new(now, 1, usize::from(correct)));
        let idx = self.cursor_pos();
        if correct && expected == ' ' && idx >= self.words_completed_upto {
            self.stats.complete_word();
            self.words_completed_upto = idx + 1;
        }
        self.input.push(Input {
            char: c,
            outcome,
            timestamp: now,
        });
        self.refill();
    }

    pub fn backspace(&mut self) {
        if !self.has_finished() {
            self.input.pop();
        }
    }

    /// Advances the WPM readout and the time limit.
    pub fn on_tick(&mut self, now: u64) -> WpmDisplay {
        if let (Some(limit), Some(_)) = (self.settings.time_limit_ms, self.stats.first_typed_at) {
            if self.finished_at.is_none() && self.stats.elapsed_ms(now) >= limit {
                self.finished_at = Some(now);
            }
        }
        self.tracker.tick(now, &self.stats)
    }

    /// Milliseconds left on the clock, if the session is timed.
    pub fn time_remaining_ms(&self, now: u64) -> Option<u64> {
        self.settings
            .time_limit_ms
            .map(|limit| limit.saturating_sub(self.stats.elapsed_ms(now)))
    }

    /// Extends the target once the cursor nears its end.
    pub fn refill(&mut self) {
        if self.remaining() >= self.settings.refill_margin {
            return;
        }
        // the last char decides whether the source inserts a separator
        let seed: String = self.target.last().map(char::to_string).unwrap_or_default();
        let seed_len = seed.chars().count();
        let extended = self
            .source
            .ensure_length(seed, seed_len.saturating_add(self.settings.refill_step));
        let before = self.target.len();
        self.target.extend(extended.chars().skip(seed_len));
        debug!("refilled {} chars at cursor {}", self.target.len() - before, self.cursor_pos());
    }

    pub fn has_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn finish(&mut self, now: u64) -> SessionSummary {
        let ended_at = *self.finished_at.get_or_insert(now);
        self.stats.finalize(ended_at)
    }
}

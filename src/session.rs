use crate::stats::{calculate_accuracy, calculate_session_average_wpm};

/// Running totals for one practice session. Timestamps are milliseconds on
/// the session clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub typed_chars: usize,
    pub correct_chars: usize,
    pub completed_words: usize,
    pub first_typed_at: Option<u64>,
    pub last_typed_at: Option<u64>,
}

impl SessionStats {
    pub fn record_keystroke(&mut self, now: u64, correct: bool) {
        self.first_typed_at.get_or_insert(now);
        self.last_typed_at = Some(now);
        self.typed_chars += 1;
        if correct {
            self.correct_chars += 1;
        }
    }

    pub fn complete_word(&mut self) {
        self.completed_words += 1;
    }

    pub fn has_started(&self) -> bool {
        self.first_typed_at.is_some()
    }

    /// Milliseconds from the first keystroke to `now`.
    pub fn elapsed_ms(&self, now: u64) -> u64 {
        self.first_typed_at
            .map_or(0, |first| now.saturating_sub(first))
    }

    pub fn accuracy(&self) -> u32 {
        calculate_accuracy(self.correct_chars, self.typed_chars)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Read-only snapshot for the summary screen.
    pub fn finalize(&self, ended_at: u64) -> SessionSummary {
        let duration_ms = self.elapsed_ms(ended_at);
        SessionSummary {
            typed_chars: self.typed_chars,
            correct_chars: self.correct_chars,
            completed_words: self.completed_words,
            duration_ms,
            accuracy: self.accuracy(),
            average_wpm: calculate_session_average_wpm(self.correct_chars, duration_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub typed_chars: usize,
    pub correct_chars: usize,
    pub completed_words: usize,
    pub duration_ms: u64,
    pub accuracy: u32,
    pub average_wpm: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_keystroke_is_remembered() {
        let mut stats = SessionStats::default();
        assert!(!stats.has_started());

        stats.record_keystroke(1_000, true);
        stats.record_keystroke(1_250, false);
        stats.record_keystroke(1_400, true);

        assert_eq!(stats.first_typed_at, Some(1_000));
        assert_eq!(stats.last_typed_at, Some(1_400));
        assert_eq!(stats.typed_chars, 3);
        assert_eq!(stats.correct_chars, 2);
        assert_eq!(stats.elapsed_ms(2_000), 1_000);
    }

    #[test]
    fn test_finalize_snapshots_totals() {
        let mut stats = SessionStats::default();
        for i in 0..300 {
            stats.record_keystroke(i * 200, i % 10 != 0);
        }
        stats.complete_word();

        let summary = stats.finalize(60_000);
        assert_eq!(summary.typed_chars, 300);
        assert_eq!(summary.correct_chars, 270);
        assert_eq!(summary.completed_words, 1);
        assert_eq!(summary.duration_ms, 60_000);
        assert_eq!(summary.accuracy, 90);
        assert_eq!(summary.average_wpm, 54);
    }

    #[test]
    fn test_empty_session_summary() {
        let summary = SessionStats::default().finalize(10_000);
        assert_eq!(summary.accuracy, 100);
        assert_eq!(summary.average_wpm, 0);
        assert_eq!(summary.duration_ms, 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut stats = SessionStats::default();
        stats.record_keystroke(5, true);
        stats.complete_word();
        stats.reset();
        assert_eq!(stats, SessionStats::default());
    }
}

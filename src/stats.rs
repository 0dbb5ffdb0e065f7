use std::collections::VecDeque;

use crate::session::SessionStats;

/// Standard word length used to turn characters into words.
pub const CHARS_PER_WORD: f64 = 5.0;

const MS_PER_MINUTE: f64 = 60_000.0;

/// One keystroke (or batch of keystrokes) at `t` milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingEvent {
    pub t: u64,
    pub chars: usize,
    pub correct_chars: usize,
}

impl TypingEvent {
    pub fn new(t: u64, chars: usize, correct_chars: usize) -> Self {
        Self {
            t,
            chars,
            correct_chars,
        }
    }
}

/// WPM over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RollingWpm {
    /// All typed characters.
    pub raw_wpm: u32,
    /// Correct characters only.
    pub wpm: u32,
    pub has_events: bool,
}

fn chars_to_wpm(chars: usize, ms: f64) -> u32 {
    ((chars as f64 / CHARS_PER_WORD) / (ms / MS_PER_MINUTE)).round() as u32
}

/// Drops events older than `now - retention_ms` from the front of the log.
pub fn trim_typing_events(events: &mut VecDeque<TypingEvent>, now: u64, retention_ms: u64) {
    let cutoff = now.saturating_sub(retention_ms);
    while events.front().is_some_and(|event| event.t < cutoff) {
        events.pop_front();
    }
}

/// Sums the events in `[now - window_ms, now]`, newest first, stopping at the
/// first event older than the window.
pub fn calculate_rolling_wpm_from_events(
    events: &VecDeque<TypingEvent>,
    now: u64,
    window_ms: u64,
) -> RollingWpm {
    if window_ms == 0 {
        return RollingWpm::default();
    }

    let start = now.saturating_sub(window_ms);
    let mut chars = 0;
    let mut correct = 0;
    let mut has_events = false;

    for event in events.iter().rev() {
        if event.t < start {
            break;
        }
        if event.t > now {
            continue;
        }
        chars += event.chars;
        correct += event.correct_chars;
        has_events = true;
    }

    let window = window_ms as f64;
    RollingWpm {
        raw_wpm: chars_to_wpm(chars, window),
        wpm: chars_to_wpm(correct, window),
        has_events,
    }
}

/// Tunables for the live WPM readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WpmDisplayPolicy {
    pub window_ms: u64,
    /// How long events are kept in the log.
    pub retention_ms: u64,
    pub warmup_ms: u64,
    pub warmup_min_chars: usize,
    pub idle_reset_ms: u64,
}

impl Default for WpmDisplayPolicy {
    fn default() -> Self {
        let window_ms = 10_000;
        Self {
            window_ms,
            retention_ms: window_ms * 3,
            warmup_ms: 5_000,
            warmup_min_chars: 25,
            idle_reset_ms: 15_000,
        }
    }
}

/// What the live WPM readout shows on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum WpmDisplay {
    /// Nothing typed yet.
    #[default]
    NoData,
    /// Too early for a stable reading.
    Warmup,
    Active(u32),
    /// Brief pause, previous value kept steady.
    Held(Option<u32>),
    /// Idle for too long.
    Reset,
}

impl WpmDisplay {
    pub fn value(&self) -> Option<u32> {
        match self {
            WpmDisplay::Active(wpm) => Some(*wpm),
            WpmDisplay::Held(previous) => *previous,
            WpmDisplay::NoData | WpmDisplay::Warmup | WpmDisplay::Reset => None,
        }
    }

    /// Readout text, with an em dash standing in for "no value".
    pub fn label(&self) -> String {
        self.value()
            .map_or_else(|| "\u{2014}".to_string(), |wpm| wpm.to_string())
    }
}

/// Inputs to one evaluation of the display policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WpmDisplayInput {
    pub now: u64,
    pub first_typed_at: Option<u64>,
    pub last_typed_at: Option<u64>,
    pub total_chars: usize,
    pub rolling: RollingWpm,
    pub previous: Option<u32>,
}

pub fn rolling_wpm_display(input: &WpmDisplayInput, policy: &WpmDisplayPolicy) -> WpmDisplay {
    let first_typed_at = match input.first_typed_at {
        Some(t) if input.total_chars > 0 => t,
        _ => return WpmDisplay::NoData,
    };

    let since_first = input.now.saturating_sub(first_typed_at);
    if since_first < policy.warmup_ms && input.total_chars < policy.warmup_min_chars {
        return WpmDisplay::Warmup;
    }

    if input.rolling.has_events {
        return WpmDisplay::Active(input.rolling.wpm);
    }

    let idle_for = input
        .last_typed_at
        .map_or(u64::MAX, |t| input.now.saturating_sub(t));
    if idle_for <= policy.idle_reset_ms {
        WpmDisplay::Held(input.previous)
    } else {
        WpmDisplay::Reset
    }
}

/// Percentage of correct characters; 100 when nothing was typed.
pub fn calculate_accuracy(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

/// Whole-session pace from correct characters. Sessions under a second read 0.
pub fn calculate_session_average_wpm(correct_chars: usize, session_ms: u64) -> u32 {
    if session_ms < 1_000 || correct_chars == 0 {
        return 0;
    }
    chars_to_wpm(correct_chars, session_ms as f64)
}

/// Bounded keystroke log plus the display state machine, advanced once per
/// UI tick.
#[derive(Debug, Clone, Default)]
pub struct RollingWpmTracker {
    events: VecDeque<TypingEvent>,
    policy: WpmDisplayPolicy,
    display: WpmDisplay,
}

impl RollingWpmTracker {
    pub fn new(policy: WpmDisplayPolicy) -> Self {
        Self {
            events: VecDeque::new(),
            policy,
            display: WpmDisplay::NoData,
        }
    }

    pub fn policy(&self) -> &WpmDisplayPolicy {
        &self.policy
    }

    pub fn record(&mut self, event: TypingEvent) {
        // keystrokes arrive in order; merge same-millisecond bursts
        match self.events.back_mut() {
            Some(last) if last.t == event.t => {
                last.chars += event.chars;
                last.correct_chars += event.correct_chars;
            }
            _ => self.events.push_back(event),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn display(&self) -> WpmDisplay {
        self.display
    }

    pub fn tick(&mut self, now: u64, stats: &SessionStats) -> WpmDisplay {
        trim_typing_events(&mut self.events, now, self.policy.retention_ms);
        let rolling = calculate_rolling_wpm_from_events(&self.events, now, self.policy.window_ms);
        self.display = rolling_wpm_display(
            &WpmDisplayInput {
                now,
                first_typed_at: stats.first_typed_at,
                last_typed_at: stats.last_typed_at,
                total_chars: stats.typed_chars,
                rolling,
                previous: self.display.value(),
            },
            &self.policy,
        );
        self.display
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.display = WpmDisplay::NoData;
    }
}

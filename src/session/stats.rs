use std::time::{Duration, Instant};

use serde::Serialize;

/// Live speed and accuracy figures.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub wpm: f64,
    pub accuracy: f64,
    pub chars_typed: usize,
    pub mistakes: usize,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self {
            wpm: 0.0,
            accuracy: 100.0,
            chars_typed: 0,
            mistakes: 0,
        }
    }
}

impl StatsSnapshot {
    /// Derive a snapshot from cumulative counters. Never yields NaN: no
    /// elapsed time means zero speed, no keystrokes means full accuracy.
    pub fn compute(chars_typed: usize, mistakes: usize, elapsed: Duration) -> Self {
        let mistakes = mistakes.min(chars_typed);
        let minutes = elapsed.as_secs_f64() / 60.0;
        let wpm = if minutes > 0.0 {
            (chars_typed as f64 / 5.0) / minutes
        } else {
            0.0
        };
        let accuracy = if chars_typed > 0 {
            (chars_typed - mistakes) as f64 / chars_typed as f64 * 100.0
        } else {
            100.0
        };

        Self {
            wpm: if wpm.is_finite() { wpm.max(0.0) } else { 0.0 },
            accuracy: accuracy.clamp(0.0, 100.0),
            chars_typed,
            mistakes,
        }
    }
}

/// Cumulative keystroke counters plus the running timer for the current
/// segment. The timer starts at the first keystroke of a segment and is
/// cleared when the next segment is requested.
pub struct StatsTracker {
    chars_typed: usize,
    mistakes: usize,
    started_at: Option<Instant>,
    last_refresh: Option<Instant>,
    interval: Duration,
    snapshot: StatsSnapshot,
}

impl StatsTracker {
    pub fn new(interval: Duration) -> Self {
        Self {
            chars_typed: 0,
            mistakes: 0,
            started_at: None,
            last_refresh: None,
            interval,
            snapshot: StatsSnapshot::default(),
        }
    }

    pub fn record(&mut self, correct: bool) {
        self.chars_typed += 1;
        if !correct {
            self.mistakes += 1;
        }
    }

    pub fn chars_typed(&self) -> usize {
        self.chars_typed
    }

    pub fn mistakes(&self) -> usize {
        self.mistakes
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot
    }

    pub fn start_timer(&mut self, at: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(at);
            self.last_refresh = Some(at);
        }
    }

    pub fn reset_timer(&mut self) {
        self.started_at = None;
        self.last_refresh = None;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    pub fn refresh(&mut self, now: Instant) -> StatsSnapshot {
        self.snapshot = StatsSnapshot::compute(self.chars_typed, self.mistakes, self.elapsed(now));
        self.last_refresh = Some(now);
        self.snapshot
    }

    /// Refresh when a full interval has passed since the last refresh.
    pub fn refresh_if_due(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_refresh else {
            return false;
        };
        if now.saturating_duration_since(last) < self.interval {
            return false;
        }
        self.refresh(now);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.interval);
    }
}

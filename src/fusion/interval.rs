//! Fixed-length window averaging of the overall score.

use crate::models::summary::mean;
use crate::models::IntervalSummary;

/// Accumulates overall scores and emits one [`IntervalSummary`] per
/// window that received at least one value. Window starts are whole
/// multiples of `interval_len` measured from session start.
#[derive(Debug)]
pub struct IntervalAggregator {
    interval_len: f64,
    index: u64,
    accumulated: Vec<f64>,
}

impl IntervalAggregator {
    pub fn new(interval_len: f64) -> Self {
        Self {
            interval_len: interval_len.max(f64::EPSILON),
            index: 0,
            accumulated: Vec::new(),
        }
    }

    pub fn interval_start(&self) -> f64 {
        self.index as f64 * self.interval_len
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.accumulated.clear();
    }

    /// Record `overall` at session time `now_secs`. The window boundary is
    /// checked first, so a value at exactly `start + len` opens the next
    /// window and the flushed summary excludes it.
    pub fn observe(&mut self, now_secs: f64, overall: f64) -> Option<IntervalSummary> {
        let mut flushed = None;
        if now_secs >= self.interval_start() + self.interval_len {
            flushed = self.flush();
            let current = (now_secs / self.interval_len).floor() as u64;
            self.index = current.max(self.index + 1);
        }
        self.accumulated.push(overall);
        flushed
    }

    /// Close the current window, if it holds anything.
    pub fn finish(&mut self) -> Option<IntervalSummary> {
        self.flush()
    }

    fn flush(&mut self) -> Option<IntervalSummary> {
        let overall_attention = mean(self.accumulated.drain(..))?;
        Some(IntervalSummary {
            interval_start: self.interval_start(),
            overall_attention,
        })
    }
}

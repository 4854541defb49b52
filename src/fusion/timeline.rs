//! Session timeline written by the frame path and read through snapshots.

use std::sync::RwLock;

use crate::models::{IntervalSummary, Sample};

/// Sole writer is the frame-driving context; readers clone under the read
/// lock so they never observe a half-appended sample.
#[derive(Default)]
pub struct Timeline {
    samples: RwLock<Vec<Sample>>,
    intervals: RwLock<Vec<IntervalSummary>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_sample(&self, sample: Sample) {
        self.samples
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(sample);
    }

    pub fn push_interval(&self, interval: IntervalSummary) {
        self.intervals
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(interval);
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn intervals(&self) -> Vec<IntervalSummary> {
        self.intervals.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.samples.write().unwrap_or_else(|p| p.into_inner()).clear();
        self.intervals.write().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

/// Fires once per whole multiple of `period` on the session axis.
#[derive(Debug)]
pub struct SampleSchedule {
    period: f64,
    next_due: f64,
}

impl SampleSchedule {
    pub fn new(period: f64) -> Self {
        let period = period.max(f64::EPSILON);
        Self {
            period,
            next_due: period,
        }
    }

    pub fn reset(&mut self) {
        self.next_due = self.period;
    }

    /// True when `now_secs` has reached the next grid point. Skipped grid
    /// points are not replayed.
    pub fn due(&mut self, now_secs: f64) -> bool {
        if now_secs < self.next_due {
            return false;
        }
        self.next_due = (now_secs / self.period).floor() * self.period + self.period;
        true
    }
}

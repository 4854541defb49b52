//! Throttled, smoothed wrapper around an external emotion classifier.

pub mod label;

pub use label::Emotion;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::EmotionConfig;
use crate::perception::{EmotionClassifier, Frame};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Buffered labels needed before majority voting applies.
const MIN_VOTES: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionReading {
    /// Majority label over the smoothing window.
    pub label: Emotion,
    /// Label of the last successful classification.
    pub raw: Emotion,
    /// Face-channel attention, 0-100.
    pub weight: f64,
    /// Whether the classifier ran for this call.
    pub invoked: bool,
}

pub struct EmotionAdapter {
    classifier: Box<dyn EmotionClassifier>,
    config: EmotionConfig,
    last_emotion: Emotion,
    last_invocation: Option<f64>,
    votes: VecDeque<Emotion>,
}

/// Most frequent label; ties go to the label seen first.
pub fn majority(votes: &VecDeque<Emotion>) -> Option<Emotion> {
    let mut best: Option<(Emotion, usize)> = None;
    let mut seen: Vec<Emotion> = Vec::with_capacity(votes.len());
    for vote in votes {
        if seen.contains(vote) {
            continue;
        }
        seen.push(*vote);
        let count = votes.iter().filter(|v| *v == vote).count();
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((*vote, count));
        }
    }
    best.map(|(label, _)| label)
}

impl EmotionAdapter {
    pub fn new(classifier: Box<dyn EmotionClassifier>, config: EmotionConfig) -> Self {
        let votes = VecDeque::with_capacity(config.smoothing_window);
        Self {
            classifier,
            config,
            last_emotion: Emotion::Neutral,
            last_invocation: None,
            votes,
        }
    }

    /// Forget per-session state; the classifier itself is kept.
    pub fn reset(&mut self) {
        self.last_emotion = Emotion::Neutral;
        self.last_invocation = None;
        self.votes.clear();
    }

    fn throttled(&self, now_secs: f64) -> bool {
        self.last_invocation
            .map_or(false, |last| now_secs - last < self.config.min_interval_secs)
    }

    /// Classify `frame` if the throttle allows, then smooth. Failures and
    /// missing faces keep the last known label.
    pub fn observe(&mut self, frame: &Frame, now_secs: f64) -> EmotionReading {
        let mut invoked = false;
        if !self.throttled(now_secs) {
            invoked = true;
            self.last_invocation = Some(now_secs);
            match self.classifier.classify(frame) {
                Ok(Some(label)) => {
                    self.last_emotion = Emotion::from_label(&label);
                    log_debug!("emotion classified as {} at {:.2}s", self.last_emotion, now_secs);
                }
                Ok(None) => {}
                Err(err) => log_warn!("emotion classifier failed: {err:#}"),
            }
        }

        let raw = self.last_emotion;
        if self.votes.len() == self.config.smoothing_window.max(1) {
            self.votes.pop_front();
        }
        self.votes.push_back(raw);
        let label = if self.votes.len() < MIN_VOTES {
            raw
        } else {
            majority(&self.votes).unwrap_or(raw)
        };

        EmotionReading {
            label,
            raw,
            weight: raw.weight(),
            invoked,
        }
    }
}

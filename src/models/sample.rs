use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;

use super::channel::{Channel, ChannelScores};

/// One timeline entry, appended at most once per sample period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Seconds since session start.
    pub timestamp: f64,
    pub posture: f64,
    pub eye_attention: f64,
    pub face_attention: f64,
    pub noise_attention: f64,
    pub overall: f64,
    pub emotion: Emotion,
    /// Smoothed gaze, 0-100.
    pub gaze_score: f64,
    /// Blinks per minute.
    pub blink_rate: f64,
    pub ear_value: f64,
}

impl Sample {
    pub fn channel_scores(&self) -> ChannelScores {
        ChannelScores::new(
            self.posture,
            self.eye_attention,
            self.face_attention,
            self.noise_attention,
        )
    }

    pub fn channel(&self, channel: Channel) -> f64 {
        self.channel_scores()[channel]
    }
}

/// Mean overall attention over `[interval_start, interval_start + len)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntervalSummary {
    pub interval_start: f64,
    pub overall_attention: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoiseRecord {
    pub timestamp: f64,
    pub db_level: f64,
    pub attention: f64,
}

/// Per-frame eye measurements kept for end-of-session statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EyeReading {
    pub timestamp: f64,
    /// Smoothed gaze, 0-1.
    pub gaze_score: f64,
    pub blink_rate: f64,
    pub ear_value: f64,
}

/// The most recent fused tuple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FusedMetrics {
    pub scores: ChannelScores,
    pub overall: f64,
    pub emotion: Emotion,
}

impl Default for FusedMetrics {
    /// Reported before anything has been fused.
    fn default() -> Self {
        Self {
            scores: ChannelScores::new(50.0, 50.0, 50.0, 100.0),
            overall: 50.0,
            emotion: Emotion::Neutral,
        }
    }
}

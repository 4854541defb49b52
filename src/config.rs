use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::ChannelScores;

/// Posture classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    pub head_turn_threshold: f64,
    pub shoulder_turn_threshold: f64,
    pub head_tilt_threshold: f64,
    /// Rolling score history length
    pub history_len: usize,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            head_turn_threshold: 0.2,
            shoulder_turn_threshold: 0.15,
            head_tilt_threshold: 0.05,
            history_len: 30,
        }
    }
}

/// Blink and gaze tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeConfig {
    pub ear_threshold: f64,
    pub ear_smoothing_window: usize,
    /// Closed-frame run accepted as a blink, inclusive on both ends
    pub min_blink_frames: u32,
    pub max_blink_frames: u32,
    pub blink_debounce_secs: f64,
    /// No blink rate is reported before this much session time
    pub blink_rate_warmup_secs: f64,
    pub blink_rate_min_window_secs: f64,
    pub blink_rate_max_window_secs: f64,
    pub gaze_smoothing_window: usize,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.2,
            ear_smoothing_window: 3,
            min_blink_frames: 3,
            max_blink_frames: 20,
            blink_debounce_secs: 0.2,
            blink_rate_warmup_secs: 5.0,
            blink_rate_min_window_secs: 10.0,
            blink_rate_max_window_secs: 60.0,
            gaze_smoothing_window: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Minimum session time between classifier invocations
    pub min_interval_secs: f64,
    pub smoothing_window: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 1.0,
            smoothing_window: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub chunk_size: usize,
    pub sample_rate: u32,
    /// Full-scale RMS of a signed 16-bit sample
    pub reference_rms: f64,
    /// Sound pressure level mapped to `reference_rms`
    pub reference_spl: f64,
    pub min_db: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            chunk_size: 48_000,
            sample_rate: 48_000,
            reference_rms: 32_767.0,
            reference_spl: 94.0,
            min_db: 35.0,
        }
    }
}

/// Cadences and weights of the fusion loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub process_interval_ms: u64,
    pub sample_interval_secs: f64,
    pub interval_len_secs: f64,
    pub weights: ChannelScores,
    pub join_timeout_ms: u64,
    /// Bounded wait of the persistence worker between queue polls
    pub queue_poll_ms: u64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            process_interval_ms: 100,
            sample_interval_secs: 1.0,
            interval_len_secs: 10.0,
            weights: ChannelScores::uniform(0.25),
            join_timeout_ms: 1_000,
            queue_poll_ms: 1_000,
        }
    }
}

impl FusionConfig {
    pub fn process_interval_secs(&self) -> f64 {
        self.process_interval_ms as f64 / 1000.0
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn queue_poll(&self) -> Duration {
        Duration::from_millis(self.queue_poll_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub posture: PostureConfig,
    pub eyes: EyeConfig,
    pub emotion: EmotionConfig,
    pub noise: NoiseConfig,
    pub fusion: FusionConfig,
}

impl AnalyzerConfig {
    /// Load from a JSON file. A missing file yields the defaults; a malformed
    /// one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::EyeConfig;
use crate::utils::RollingMean;

/// Mutable blink bookkeeping for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkState {
    pub consecutive_closed_frames: u32,
    pub last_blink_time: Option<f64>,
    /// Append-only.
    pub blink_timestamps: Vec<f64>,
    pub threshold: f64,
    pub calibrated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkUpdate {
    pub smoothed_ear: f64,
    pub blink_registered: bool,
}

/// Closed-run blink detector over a smoothed EAR signal.
pub struct BlinkDetector {
    config: EyeConfig,
    state: BlinkState,
    smoothing: RollingMean,
}

impl BlinkDetector {
    pub fn new(config: EyeConfig) -> Self {
        let smoothing = RollingMean::new(config.ear_smoothing_window);
        let state = BlinkState {
            consecutive_closed_frames: 0,
            last_blink_time: None,
            blink_timestamps: Vec::new(),
            threshold: config.ear_threshold,
            calibrated: false,
        };
        Self {
            config,
            state,
            smoothing,
        }
    }

    pub fn state(&self) -> &BlinkState {
        &self.state
    }

    pub fn blink_count(&self) -> usize {
        self.state.blink_timestamps.len()
    }

    pub fn threshold(&self) -> f64 {
        self.state.threshold
    }

    /// Set the closed-eye threshold halfway between an open and a closed
    /// reference EAR.
    pub fn calibrate(&mut self, open_ear: f64, closed_ear: f64) -> Result<f64> {
        if !open_ear.is_finite() || !closed_ear.is_finite() {
            bail!("calibration EAR values must be finite");
        }
        if open_ear <= closed_ear {
            bail!("open-eye EAR ({open_ear:.3}) must exceed closed-eye EAR ({closed_ear:.3})");
        }
        self.state.threshold = (open_ear + closed_ear) / 2.0;
        self.state.calibrated = true;
        Ok(self.state.threshold)
    }

    /// Feed one frame's EAR at session time `now_secs`.
    pub fn update(&mut self, ear: f64, now_secs: f64) -> BlinkUpdate {
        let smoothed_ear = self.smoothing.push(ear);
        let mut blink_registered = false;

        if smoothed_ear < self.state.threshold {
            self.state.consecutive_closed_frames += 1;
        } else {
            let closed = self.state.consecutive_closed_frames;
            let plausible =
                (self.config.min_blink_frames..=self.config.max_blink_frames).contains(&closed);
            let debounced = self
                .state
                .last_blink_time
                .map_or(true, |last| now_secs - last >= self.config.blink_debounce_secs);
            if plausible && debounced {
                self.state.blink_timestamps.push(now_secs);
                self.state.last_blink_time = Some(now_secs);
                blink_registered = true;
            }
            self.state.consecutive_closed_frames = 0;
        }

        BlinkUpdate {
            smoothed_ear,
            blink_registered,
        }
    }

    /// Blinks per minute over a trailing window of
    /// `clamp(elapsed, min_window, max_window)` seconds. Zero during warmup.
    pub fn blink_rate(&self, now_secs: f64) -> f64 {
        if now_secs < self.config.blink_rate_warmup_secs || self.state.blink_timestamps.is_empty() {
            return 0.0;
        }
        let window = now_secs
            .min(self.config.blink_rate_max_window_secs)
            .max(self.config.blink_rate_min_window_secs);
        let cutoff = now_secs - window;
        let recent = self
            .state
            .blink_timestamps
            .iter()
            .filter(|t| **t >= cutoff)
            .count();
        recent as f64 / window * 60.0
    }
}

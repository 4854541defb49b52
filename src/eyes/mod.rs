//! Ocular signals: eye aspect ratio, blinks, gaze and the eye-channel score.

pub mod attention;
pub mod blink;
pub mod gaze;

pub use attention::eye_attention;
pub use blink::{BlinkDetector, BlinkState, BlinkUpdate};
pub use gaze::GazeTracker;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::EyeConfig;
use crate::models::EyeReading;
use crate::perception::{face_mesh_index, FaceMesh, Landmark};

/// EAR reported when a contour is degenerate.
pub const DEFAULT_EAR: f64 = 0.25;

/// Eye aspect ratio of one six-point contour.
pub fn compute_ear(contour: &[Landmark; 6]) -> f64 {
    let v1 = contour[1].distance(&contour[5]);
    let v2 = contour[2].distance(&contour[4]);
    let h = contour[0].distance(&contour[3]);
    if h > 0.0 {
        (v1 + v2) / (2.0 * h)
    } else {
        DEFAULT_EAR
    }
}

/// Mean EAR of both eyes in pixel space, `None` if either contour is absent.
pub fn mesh_ear(mesh: &FaceMesh, width: f64, height: f64) -> Option<f64> {
    let left = mesh.eye_contour(&face_mesh_index::LEFT_EYE, width, height)?;
    let right = mesh.eye_contour(&face_mesh_index::RIGHT_EYE, width, height)?;
    Some((compute_ear(&left) + compute_ear(&right)) / 2.0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EyeMetrics {
    pub ear: f64,
    pub smoothed_ear: f64,
    pub blink_registered: bool,
    pub blink_rate: f64,
    /// Smoothed gaze, 0-1.
    pub gaze_score: f64,
    /// Eye-channel attention, 0-100.
    pub attention: f64,
}

impl EyeMetrics {
    pub fn reading(&self, timestamp: f64) -> EyeReading {
        EyeReading {
            timestamp,
            gaze_score: self.gaze_score,
            blink_rate: self.blink_rate,
            ear_value: self.ear,
        }
    }
}

pub struct EyeSignalProcessor {
    blinks: BlinkDetector,
    gaze: GazeTracker,
}

impl EyeSignalProcessor {
    pub fn new(config: EyeConfig) -> Self {
        let gaze = GazeTracker::new(config.gaze_smoothing_window);
        Self {
            blinks: BlinkDetector::new(config),
            gaze,
        }
    }

    pub fn calibrate(&mut self, open_ear: f64, closed_ear: f64) -> Result<f64> {
        self.blinks.calibrate(open_ear, closed_ear)
    }

    pub fn blink_state(&self) -> &BlinkState {
        self.blinks.state()
    }

    pub fn blink_count(&self) -> usize {
        self.blinks.blink_count()
    }

    /// Process one face mesh observed in a `width` x `height` frame at
    /// session time `now_secs`. Returns `None` when the eye contours are
    /// missing; the caller substitutes its default.
    pub fn process(
        &mut self,
        mesh: &FaceMesh,
        width: f64,
        height: f64,
        now_secs: f64,
    ) -> Option<EyeMetrics> {
        let ear = mesh_ear(mesh, width, height)?;
        let update = self.blinks.update(ear, now_secs);
        let blink_rate = self.blinks.blink_rate(now_secs);
        let gaze_score = self.gaze.update(mesh);
        let attention = eye_attention(gaze_score, blink_rate, ear) * 100.0;

        Some(EyeMetrics {
            ear,
            smoothed_ear: update.smoothed_ear,
            blink_registered: update.blink_registered,
            blink_rate,
            gaze_score,
            attention,
        })
    }
}

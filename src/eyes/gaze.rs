use crate::perception::{face_mesh_index, FaceMesh};
use crate::utils::RollingMean;

/// Horizontal tolerance as a share of frame width.
const MAX_DX: f64 = 0.3;
/// Vertical tolerance as a share of frame height.
const MAX_DY: f64 = 0.25;
const HORIZONTAL_WEIGHT: f64 = 0.7;
const VERTICAL_WEIGHT: f64 = 0.3;
/// Reported when the mesh lacks the needed points.
pub const NEUTRAL_GAZE: f64 = 0.5;

/// Instantaneous gaze centering in [0, 1], before smoothing.
///
/// Works in normalized coordinates so frame dimensions cancel out.
pub fn raw_gaze_score(mesh: &FaceMesh) -> Option<f64> {
    let nose = mesh.get(face_mesh_index::NOSE_TIP)?;
    let left = mesh.get(face_mesh_index::LEFT_EYE_CENTER)?;
    let right = mesh.get(face_mesh_index::RIGHT_EYE_CENTER)?;

    let eye_center_x = (left.x + right.x) / 2.0;
    let dx = ((nose.x + eye_center_x) / 2.0 - 0.5).abs();
    let dy = (nose.y - 0.5).abs();

    let horizontal = (1.0 - dx / MAX_DX).max(0.0);
    let vertical = (1.0 - dy / MAX_DY).max(0.0);
    Some(horizontal * HORIZONTAL_WEIGHT + vertical * VERTICAL_WEIGHT)
}

pub struct GazeTracker {
    history: RollingMean,
}

impl GazeTracker {
    pub fn new(window: usize) -> Self {
        Self {
            history: RollingMean::new(window),
        }
    }

    /// Smoothed gaze score clamped to [0, 1].
    pub fn update(&mut self, mesh: &FaceMesh) -> f64 {
        match raw_gaze_score(mesh) {
            Some(score) => self.history.push(score).clamp(0.0, 1.0),
            None => NEUTRAL_GAZE,
        }
    }
}

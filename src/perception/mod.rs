//! Contracts for the external perception models.
//!
//! Pose estimation, face meshing and emotion classification run outside this
//! crate. Each provider reports "nothing detected" as `Ok(None)` and reserves
//! `Err` for a failed invocation; the pipeline degrades both to a default.

pub mod landmarks;

pub use landmarks::{face_mesh_index, pose_index, FaceMesh, Landmark, PoseLandmarks};

use anyhow::Result;

/// A captured RGB frame.
pub type Frame = image::RgbImage;

pub trait PoseLandmarkProvider: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Option<PoseLandmarks>>;
}

pub trait FaceMeshProvider: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceMesh>>;
}

/// Returns the dominant emotion label of the first face in the frame, or
/// `None` when no face is found.
pub trait EmotionClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<Option<String>>;
}

use serde::{Deserialize, Serialize};

/// A normalized landmark: x and y in [0, 1] relative to frame width/height.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// 33-point body pose layout.
pub mod pose_index {
    pub const NOSE: usize = 0;
    pub const LEFT_EAR: usize = 7;
    pub const RIGHT_EAR: usize = 8;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const COUNT: usize = 33;
}

/// 468-point face mesh layout.
pub mod face_mesh_index {
    pub const NOSE_TIP: usize = 1;
    pub const LEFT_EYE_CENTER: usize = 33;
    pub const RIGHT_EYE_CENTER: usize = 362;
    /// Outer corner, two upper lids, inner corner, two lower lids.
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
    pub const COUNT: usize = 468;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PoseLandmarks {
    pub points: Vec<Landmark>,
}

impl PoseLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index).filter(|p| p.is_finite())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FaceMesh {
    pub points: Vec<Landmark>,
}

impl FaceMesh {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index).filter(|p| p.is_finite())
    }

    /// Six contour points in pixel space, or `None` if any is missing.
    pub fn eye_contour(
        &self,
        indices: &[usize; 6],
        width: f64,
        height: f64,
    ) -> Option<[Landmark; 6]> {
        let mut contour = [Landmark::default(); 6];
        for (slot, index) in contour.iter_mut().zip(indices.iter()) {
            let point = self.get(*index)?;
            *slot = Landmark::new(point.x * width, point.y * height);
        }
        Some(contour)
    }
}

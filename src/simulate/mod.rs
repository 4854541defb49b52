//! Synthetic perception and audio sources.
//!
//! Drive the engine without a camera, microphone or models: a simulated
//! subject who mostly faces the screen, blinks every few seconds, glances
//! away now and then, and sits in a room whose noise level drifts.

mod brown_noise;

use std::thread;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::NoiseConfig;
use crate::fusion::Perception;
use crate::noise::{AudioDevice, AudioStream};
use crate::perception::{
    face_mesh_index, pose_index, EmotionClassifier, FaceMesh, FaceMeshProvider, Frame, Landmark,
    PoseLandmarkProvider, PoseLandmarks,
};

pub use brown_noise::BrownNoise;

const OPEN_EAR: f64 = 0.3;
const CLOSED_EAR: f64 = 0.08;
const BLINK_FRAMES: u32 = 4;

/// Longest a synthetic audio read blocks, so shutdown stays prompt.
const MAX_READ_PACE: Duration = Duration::from_millis(250);

fn rng_for(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

/// Shared behaviour of the simulated subject.
#[derive(Debug, Clone)]
pub struct SubjectProfile {
    /// Chance per processed frame that the subject starts looking away.
    pub distraction_rate: f64,
    /// Chance per processed frame that no face is found.
    pub dropout_rate: f64,
    /// Mean seconds between blinks at 10 processed frames per second.
    pub blink_interval_secs: f64,
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            distraction_rate: 0.02,
            dropout_rate: 0.01,
            blink_interval_secs: 4.0,
        }
    }
}

/// Build the three perception providers for one simulated subject.
pub fn perception(profile: &SubjectProfile, seed: Option<u64>) -> Perception {
    Perception {
        pose: Box::new(SyntheticPose::new(profile.clone(), rng_for(seed, 1))),
        face_mesh: Box::new(SyntheticFaceMesh::new(profile.clone(), rng_for(seed, 2))),
        emotion: Box::new(SyntheticEmotion::new(rng_for(seed, 3))),
    }
}

pub struct SyntheticPose {
    profile: SubjectProfile,
    rng: StdRng,
    away_frames: u32,
}

impl SyntheticPose {
    fn new(profile: SubjectProfile, rng: StdRng) -> Self {
        Self {
            profile,
            rng,
            away_frames: 0,
        }
    }
}

impl PoseLandmarkProvider for SyntheticPose {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<PoseLandmarks>> {
        if self.rng.gen_bool(self.profile.dropout_rate.clamp(0.0, 1.0)) {
            return Ok(None);
        }
        let distraction_rate = self.profile.distraction_rate.clamp(0.0, 1.0);
        if self.away_frames == 0 && self.rng.gen_bool(distraction_rate) {
            self.away_frames = self.rng.gen_range(10..40);
        }
        let turn = if self.away_frames > 0 {
            self.away_frames -= 1;
            0.06
        } else {
            0.0
        };

        let jitter = |rng: &mut StdRng| rng.gen_range(-0.005..0.005);
        let mut points = vec![Landmark::new(0.5, 0.5); pose_index::COUNT];
        points[pose_index::NOSE] = Landmark::new(0.5 + turn + jitter(&mut self.rng), 0.3);
        points[pose_index::LEFT_EAR] = Landmark::new(0.4, 0.3);
        points[pose_index::RIGHT_EAR] = Landmark::new(0.6, 0.3);
        points[pose_index::LEFT_SHOULDER] = Landmark::new(0.3, 0.6);
        points[pose_index::RIGHT_SHOULDER] = Landmark::new(0.7, 0.6);
        Ok(Some(PoseLandmarks::new(points)))
    }
}

pub struct SyntheticFaceMesh {
    profile: SubjectProfile,
    rng: StdRng,
    closed_frames_left: u32,
}

impl SyntheticFaceMesh {
    fn new(profile: SubjectProfile, rng: StdRng) -> Self {
        Self {
            profile,
            rng,
            closed_frames_left: 0,
        }
    }
}

/// Face mesh centered in a `width` x `height` frame whose eyes have the
/// given aspect ratio in pixel space.
pub fn face_mesh_with_ear(ear: f64, gaze_dx: f64, width: f64, height: f64) -> FaceMesh {
    let mut points = vec![Landmark::new(0.5, 0.5); face_mesh_index::COUNT];
    let aspect = if height > 0.0 { width / height } else { 1.0 };
    for (indices, cx) in [
        (face_mesh_index::LEFT_EYE, 0.45 + gaze_dx),
        (face_mesh_index::RIGHT_EYE, 0.55 + gaze_dx),
    ] {
        let half_w = 0.02;
        let half_h = ear * half_w * aspect;
        points[indices[0]] = Landmark::new(cx - half_w, 0.45);
        points[indices[1]] = Landmark::new(cx - 0.01, 0.45 - half_h);
        points[indices[2]] = Landmark::new(cx + 0.01, 0.45 - half_h);
        points[indices[3]] = Landmark::new(cx + half_w, 0.45);
        points[indices[4]] = Landmark::new(cx + 0.01, 0.45 + half_h);
        points[indices[5]] = Landmark::new(cx - 0.01, 0.45 + half_h);
    }
    points[face_mesh_index::NOSE_TIP] = Landmark::new(0.5 + gaze_dx, 0.5);
    FaceMesh::new(points)
}

impl FaceMeshProvider for SyntheticFaceMesh {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceMesh>> {
        if self.rng.gen_bool(self.profile.dropout_rate.clamp(0.0, 1.0)) {
            return Ok(None);
        }
        let blink_chance = (1.0 / (self.profile.blink_interval_secs.max(0.1) * 10.0)).min(1.0);
        if self.closed_frames_left == 0 && self.rng.gen_bool(blink_chance) {
            self.closed_frames_left = BLINK_FRAMES;
        }
        let ear = if self.closed_frames_left > 0 {
            self.closed_frames_left -= 1;
            CLOSED_EAR
        } else {
            OPEN_EAR + self.rng.gen_range(-0.02..0.02)
        };
        let gaze_dx = self.rng.gen_range(-0.03..0.03);
        Ok(Some(face_mesh_with_ear(
            ear,
            gaze_dx,
            f64::from(frame.width()),
            f64::from(frame.height()),
        )))
    }
}

const EMOTIONS: [(&str, u32); 5] = [
    ("neutral", 60),
    ("happy", 20),
    ("surprise", 8),
    ("sad", 7),
    ("angry", 5),
];

pub struct SyntheticEmotion {
    rng: StdRng,
}

impl SyntheticEmotion {
    fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl EmotionClassifier for SyntheticEmotion {
    fn classify(&mut self, _frame: &Frame) -> Result<Option<String>> {
        let total: u32 = EMOTIONS.iter().map(|(_, w)| w).sum();
        let mut pick = self.rng.gen_range(0..total);
        for (label, weight) in EMOTIONS {
            if pick < weight {
                return Ok(Some(label.to_string()));
            }
            pick -= weight;
        }
        Ok(None)
    }
}

/// Microphone that plays brown noise whose loudness drifts between
/// `quiet` and `loud` amplitudes.
pub struct SyntheticMicrophone {
    quiet: f64,
    loud: f64,
    seed: Option<u64>,
}

impl SyntheticMicrophone {
    pub fn new(quiet: f64, loud: f64, seed: Option<u64>) -> Self {
        Self { quiet, loud, seed }
    }
}

impl Default for SyntheticMicrophone {
    fn default() -> Self {
        Self::new(0.0005, 0.05, None)
    }
}

struct SyntheticStream {
    noise: BrownNoise,
    rng: StdRng,
    quiet: f64,
    loud: f64,
    chunk_size: usize,
    pace: Duration,
}

impl AudioDevice for SyntheticMicrophone {
    fn open(&self, config: &NoiseConfig) -> Result<Box<dyn AudioStream>> {
        let chunk_secs = config.chunk_size as f64 / f64::from(config.sample_rate.max(1));
        Ok(Box::new(SyntheticStream {
            noise: BrownNoise::new(self.quiet, self.seed),
            rng: rng_for(self.seed, 4),
            quiet: self.quiet,
            loud: self.loud,
            chunk_size: config.chunk_size,
            pace: Duration::from_secs_f64(chunk_secs).min(MAX_READ_PACE),
        }))
    }
}

impl AudioStream for SyntheticStream {
    fn read_chunk(&mut self) -> Result<Vec<i16>> {
        thread::sleep(self.pace);
        let amplitude = if self.rng.gen_bool(0.2) {
            self.loud
        } else {
            self.quiet
        };
        self.noise.set_amplitude(amplitude);
        Ok(self.noise.chunk(self.chunk_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eyes::mesh_ear;

    #[test]
    fn synthetic_mesh_keeps_ear_in_wide_frames() {
        let mesh = face_mesh_with_ear(0.3, 0.0, 320.0, 240.0);
        let ear = mesh_ear(&mesh, 320.0, 240.0).unwrap();
        assert!((ear - 0.3).abs() < 1e-9, "ear = {ear}");
    }

    #[test]
    fn seeded_providers_are_reproducible() {
        let frame = Frame::new(32, 32);
        let mut a = perception(&SubjectProfile::default(), Some(42));
        let mut b = perception(&SubjectProfile::default(), Some(42));
        for _ in 0..20 {
            assert_eq!(
                a.emotion.classify(&frame).unwrap(),
                b.emotion.classify(&frame).unwrap()
            );
            assert_eq!(
                a.pose.detect(&frame).unwrap().map(|p| p.points),
                b.pose.detect(&frame).unwrap().map(|p| p.points)
            );
        }
    }

    #[test]
    fn emotion_labels_come_from_the_table() {
        let mut classifier = SyntheticEmotion::new(StdRng::seed_from_u64(3));
        let frame = Frame::new(8, 8);
        for _ in 0..50 {
            let label = classifier.classify(&frame).unwrap().unwrap();
            assert!(EMOTIONS.iter().any(|(known, _)| *known == label));
        }
    }
}

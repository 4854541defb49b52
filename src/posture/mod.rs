//! Head and shoulder geometry to engagement classification.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::PostureConfig;
use crate::models::summary::mean;
use crate::perception::{pose_index, PoseLandmarks};

pub const ENGAGED_SCORE: f64 = 100.0;
pub const DISTRACTED_SCORE: f64 = 60.0;
pub const UNKNOWN_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Engagement {
    Engaged,
    Distracted,
    Unknown,
}

impl Engagement {
    pub fn score(&self) -> f64 {
        match self {
            Engagement::Engaged => ENGAGED_SCORE,
            Engagement::Distracted => DISTRACTED_SCORE,
            Engagement::Unknown => UNKNOWN_SCORE,
        }
    }
}

/// Ratios derived from nose, ear and shoulder positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PostureAngles {
    pub head_turn: f64,
    pub shoulder_turn: f64,
    pub head_tilt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostureAnalysis {
    pub angles: Option<PostureAngles>,
    pub status: Engagement,
    pub score: f64,
    pub feedback: String,
    /// Mean of the most recent scores, this frame included.
    pub recent_score: f64,
}

impl PostureAnalysis {
    fn unknown() -> Self {
        Self {
            angles: None,
            status: Engagement::Unknown,
            score: UNKNOWN_SCORE,
            feedback: "Cannot detect posture".to_string(),
            recent_score: UNKNOWN_SCORE,
        }
    }
}

/// Computes head/shoulder angles, classifies engagement and keeps running
/// engaged/distracted totals for the session.
pub struct PostureAnalyzer {
    config: PostureConfig,
    current: Option<Engagement>,
    segment_started_at: f64,
    suspended: bool,
    engaged_secs: f64,
    distracted_secs: f64,
    history: VecDeque<f64>,
}

/// Returns `None` when a landmark is missing or a separation is zero.
pub fn compute_angles(landmarks: &PoseLandmarks) -> Option<PostureAngles> {
    let nose = landmarks.get(pose_index::NOSE)?;
    let left_ear = landmarks.get(pose_index::LEFT_EAR)?;
    let right_ear = landmarks.get(pose_index::RIGHT_EAR)?;
    let left_shoulder = landmarks.get(pose_index::LEFT_SHOULDER)?;
    let right_shoulder = landmarks.get(pose_index::RIGHT_SHOULDER)?;

    let ear_separation = right_ear.x - left_ear.x;
    let shoulder_separation = right_shoulder.x - left_shoulder.x;
    if ear_separation == 0.0 || shoulder_separation == 0.0 {
        return None;
    }

    let ear_mid = left_ear.midpoint(right_ear);
    let shoulder_mid = left_shoulder.midpoint(right_shoulder);

    let head_turn = (nose.x - ear_mid.x) / ear_separation;
    let shoulder_turn = (nose.x - shoulder_mid.x) / shoulder_separation;
    let vertical_span = (ear_mid.y - shoulder_mid.y).abs();
    let head_tilt = if vertical_span > 0.0 {
        (nose.y - ear_mid.y) / vertical_span
    } else {
        0.0
    };

    let angles = PostureAngles {
        head_turn,
        shoulder_turn,
        head_tilt,
    };
    if angles.head_turn.is_finite()
        && angles.shoulder_turn.is_finite()
        && angles.head_tilt.is_finite()
    {
        Some(angles)
    } else {
        None
    }
}

impl PostureAnalyzer {
    pub fn new(config: PostureConfig) -> Self {
        let history = VecDeque::with_capacity(config.history_len);
        Self {
            config,
            current: None,
            segment_started_at: 0.0,
            suspended: false,
            engaged_secs: 0.0,
            distracted_secs: 0.0,
            history,
        }
    }

    pub fn classify(&self, angles: &PostureAngles) -> Engagement {
        if angles.head_turn.abs() > self.config.head_turn_threshold
            || angles.shoulder_turn.abs() > self.config.shoulder_turn_threshold
            || angles.head_tilt.abs() > self.config.head_tilt_threshold
        {
            Engagement::Distracted
        } else {
            Engagement::Engaged
        }
    }

    fn feedback(&self, status: Engagement, angles: &PostureAngles) -> String {
        match status {
            Engagement::Engaged => "Good posture".to_string(),
            Engagement::Unknown => "Cannot detect posture".to_string(),
            Engagement::Distracted => {
                if angles.head_tilt.abs() > self.config.head_tilt_threshold {
                    if angles.head_tilt > 0.0 {
                        "Adjust posture - looking down".to_string()
                    } else {
                        "Adjust posture - looking up".to_string()
                    }
                } else {
                    "Adjust posture - facing away from screen".to_string()
                }
            }
        }
    }

    /// Analyze one frame's landmarks at session time `now_secs`. Absent or
    /// degenerate landmarks yield the Unknown analysis.
    pub fn analyze(&mut self, landmarks: Option<&PoseLandmarks>, now_secs: f64) -> PostureAnalysis {
        let mut analysis = match landmarks.and_then(compute_angles) {
            Some(angles) => {
                let status = self.classify(&angles);
                self.track(status, now_secs);
                PostureAnalysis {
                    feedback: self.feedback(status, &angles),
                    angles: Some(angles),
                    status,
                    score: status.score(),
                    recent_score: status.score(),
                }
            }
            None => PostureAnalysis::unknown(),
        };

        if self.history.len() == self.config.history_len.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(analysis.score);
        analysis.recent_score = mean(self.history.iter().copied()).unwrap_or(analysis.score);
        analysis
    }

    /// Close the open engaged/distracted segment at `now_secs`. Time until
    /// [`resume`](Self::resume) is not attributed to either status.
    pub fn suspend(&mut self, now_secs: f64) {
        if self.suspended {
            return;
        }
        let (engaged, distracted) = self.durations(now_secs);
        self.engaged_secs = engaged;
        self.distracted_secs = distracted;
        self.segment_started_at = now_secs;
        self.suspended = true;
    }

    /// Reopen the segment for the status held before suspending.
    pub fn resume(&mut self, now_secs: f64) {
        if self.suspended {
            self.segment_started_at = now_secs;
            self.suspended = false;
        }
    }

    fn track(&mut self, status: Engagement, now_secs: f64) {
        self.resume(now_secs);
        if self.current == Some(status) {
            return;
        }
        let elapsed = (now_secs - self.segment_started_at).max(0.0);
        match self.current {
            Some(Engagement::Engaged) => self.engaged_secs += elapsed,
            Some(Engagement::Distracted) => self.distracted_secs += elapsed,
            _ => {}
        }
        self.current = Some(status);
        self.segment_started_at = now_secs;
    }

    /// Cumulative (engaged, distracted) seconds, counting the open segment up
    /// to `now_secs`.
    pub fn durations(&self, now_secs: f64) -> (f64, f64) {
        if self.suspended {
            return (self.engaged_secs, self.distracted_secs);
        }
        let open = (now_secs - self.segment_started_at).max(0.0);
        match self.current {
            Some(Engagement::Engaged) => (self.engaged_secs + open, self.distracted_secs),
            Some(Engagement::Distracted) => (self.engaged_secs, self.distracted_secs + open),
            _ => (self.engaged_secs, self.distracted_secs),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::perception::Landmark;
    use pretty_assertions::assert_eq;

    /// Upright subject facing the camera, with the nose offset by `dx`/`dy`.
    pub(crate) fn pose(dx: f64, dy: f64) -> PoseLandmarks {
        let mut points = vec![Landmark::new(0.5, 0.5); pose_index::COUNT];
        points[pose_index::NOSE] = Landmark::new(0.5 + dx, 0.3 + dy);
        points[pose_index::LEFT_EAR] = Landmark::new(0.4, 0.3);
        points[pose_index::RIGHT_EAR] = Landmark::new(0.6, 0.3);
        points[pose_index::LEFT_SHOULDER] = Landmark::new(0.3, 0.6);
        points[pose_index::RIGHT_SHOULDER] = Landmark::new(0.7, 0.6);
        PoseLandmarks::new(points)
    }

    fn analyzer() -> PostureAnalyzer {
        PostureAnalyzer::new(PostureConfig::default())
    }

    #[test]
    fn centered_pose_is_engaged() {
        let mut analyzer = analyzer();
        let result = analyzer.analyze(Some(&pose(0.0, 0.0)), 0.0);
        assert_eq!(result.status, Engagement::Engaged);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.feedback, "Good posture");
    }

    #[test]
    fn turned_head_is_distracted() {
        let mut analyzer = analyzer();
        // head_turn = 0.05 / 0.2 = 0.25
        let result = analyzer.analyze(Some(&pose(0.05, 0.0)), 0.0);
        assert_eq!(result.status, Engagement::Distracted);
        assert_eq!(result.score, 60.0);
        assert_eq!(result.feedback, "Adjust posture - facing away from screen");
    }

    #[test]
    fn tilt_feedback_wins_over_turn() {
        let mut analyzer = analyzer();
        let down = analyzer.analyze(Some(&pose(0.05, 0.03)), 0.0);
        assert_eq!(down.feedback, "Adjust posture - looking down");
        let up = analyzer.analyze(Some(&pose(0.0, -0.03)), 0.1);
        assert_eq!(up.feedback, "Adjust posture - looking up");
    }

    #[test]
    fn missing_landmarks_score_fifty() {
        let mut analyzer = analyzer();
        let absent = analyzer.analyze(None, 0.0);
        assert_eq!(absent.status, Engagement::Unknown);
        assert_eq!(absent.score, 50.0);

        let short = PoseLandmarks::new(vec![Landmark::new(0.5, 0.5); 5]);
        assert_eq!(analyzer.analyze(Some(&short), 0.0).score, 50.0);
    }

    #[test]
    fn degenerate_geometry_is_unknown() {
        let mut landmarks = pose(0.0, 0.0);
        landmarks.points[pose_index::RIGHT_EAR] = Landmark::new(0.4, 0.3);
        assert_eq!(compute_angles(&landmarks), None);

        let mut nan = pose(0.0, 0.0);
        nan.points[pose_index::NOSE] = Landmark::new(f64::NAN, 0.3);
        let mut analyzer = analyzer();
        assert_eq!(analyzer.analyze(Some(&nan), 0.0).status, Engagement::Unknown);
    }

    #[test]
    fn flat_vertical_span_means_zero_tilt() {
        let mut landmarks = pose(0.0, 0.0);
        landmarks.points[pose_index::LEFT_SHOULDER] = Landmark::new(0.3, 0.3);
        landmarks.points[pose_index::RIGHT_SHOULDER] = Landmark::new(0.7, 0.3);
        let angles = compute_angles(&landmarks).unwrap();
        assert_eq!(angles.head_tilt, 0.0);
    }

    #[test]
    fn tracks_engaged_and_distracted_time() {
        let mut analyzer = analyzer();
        analyzer.analyze(Some(&pose(0.0, 0.0)), 0.0);
        analyzer.analyze(Some(&pose(0.0, 0.0)), 2.0);
        analyzer.analyze(Some(&pose(0.1, 0.0)), 4.0);
        analyzer.analyze(None, 5.0);
        analyzer.analyze(Some(&pose(0.0, 0.0)), 7.0);
        let (engaged, distracted) = analyzer.durations(10.0);
        assert!((engaged - 7.0).abs() < 1e-9);
        assert!((distracted - 3.0).abs() < 1e-9);
    }

    #[test]
    fn history_is_bounded() {
        let mut analyzer = analyzer();
        for i in 0..45 {
            analyzer.analyze(Some(&pose(0.0, 0.0)), i as f64);
        }
        assert_eq!(analyzer.history.len(), 30);

        // 29 engaged scores and one unknown.
        let last = analyzer.analyze(None, 45.0);
        assert_eq!(analyzer.history.len(), 30);
        assert!((last.recent_score - (29.0 * 100.0 + 50.0) / 30.0).abs() < 1e-9);
    }

    #[test]
    fn suspended_time_is_not_attributed() {
        let mut analyzer = analyzer();
        analyzer.analyze(Some(&pose(0.0, 0.0)), 0.0);
        analyzer.suspend(2.0);
        assert_eq!(analyzer.durations(12.0), (2.0, 0.0));

        analyzer.resume(12.0);
        analyzer.analyze(Some(&pose(0.0, 0.0)), 12.1);
        let (engaged, distracted) = analyzer.durations(13.0);
        assert!((engaged - 3.0).abs() < 1e-9);
        assert_eq!(distracted, 0.0);
    }
}

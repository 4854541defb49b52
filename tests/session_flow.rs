use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use attention_monitor::config::NoiseConfig;
use attention_monitor::perception::{
    pose_index, EmotionClassifier, FaceMesh, FaceMeshProvider, Frame, Landmark,
    PoseLandmarkProvider, PoseLandmarks,
};
use attention_monitor::simulate::face_mesh_with_ear;
use attention_monitor::{
    AnalyzerConfig, AttentionFusionEngine, AudioDevice, AudioStream, Database, ManualClock,
    Perception, SessionClock, SessionStatus, SqliteSink,
};
use pretty_assertions::assert_eq;

fn now(clock: &ManualClock) -> f64 {
    clock.now().as_secs_f64()
}

/// Faces the screen until 15s, then turns away.
struct ScriptedPose(Arc<ManualClock>);

impl PoseLandmarkProvider for ScriptedPose {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<PoseLandmarks>> {
        let turn = if now(&self.0) < 15.0 { 0.0 } else { 0.08 };
        let mut points = vec![Landmark::new(0.5, 0.5); pose_index::COUNT];
        points[pose_index::NOSE] = Landmark::new(0.5 + turn, 0.3);
        points[pose_index::LEFT_EAR] = Landmark::new(0.4, 0.3);
        points[pose_index::RIGHT_EAR] = Landmark::new(0.6, 0.3);
        points[pose_index::LEFT_SHOULDER] = Landmark::new(0.3, 0.6);
        points[pose_index::RIGHT_SHOULDER] = Landmark::new(0.7, 0.6);
        Ok(Some(PoseLandmarks::new(points)))
    }
}

/// Eyes open except for two half-second closures.
struct ScriptedMesh(Arc<ManualClock>);

impl FaceMeshProvider for ScriptedMesh {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceMesh>> {
        let t = now(&self.0);
        let closed = (2.0..2.45).contains(&t) || (20.0..20.45).contains(&t);
        let ear = if closed { 0.1 } else { 0.3 };
        Ok(Some(face_mesh_with_ear(
            ear,
            0.0,
            f64::from(frame.width()),
            f64::from(frame.height()),
        )))
    }
}

struct AlwaysHappy;

impl EmotionClassifier for AlwaysHappy {
    fn classify(&mut self, _frame: &Frame) -> Result<Option<String>> {
        Ok(Some("happy".to_string()))
    }
}

/// Quiet room for a few chunks, then the device disappears.
struct QuietRoom;

struct QuietStream {
    remaining: usize,
}

impl AudioDevice for QuietRoom {
    fn open(&self, _config: &NoiseConfig) -> Result<Box<dyn AudioStream>> {
        Ok(Box::new(QuietStream { remaining: 3 }))
    }
}

impl AudioStream for QuietStream {
    fn read_chunk(&mut self) -> Result<Vec<i16>> {
        if self.remaining == 0 {
            bail!("device removed");
        }
        self.remaining -= 1;
        Ok(vec![0; 1024])
    }
}

/// A capture stream whose reads never return.
struct StuckMicrophone;

struct StuckStream;

impl AudioDevice for StuckMicrophone {
    fn open(&self, _config: &NoiseConfig) -> Result<Box<dyn AudioStream>> {
        Ok(Box::new(StuckStream))
    }
}

impl AudioStream for StuckStream {
    fn read_chunk(&mut self) -> Result<Vec<i16>> {
        loop {
            std::thread::sleep(Duration::from_secs(3600));
        }
    }
}

fn drive(engine: &AttentionFusionEngine, clock: &ManualClock, steps: std::ops::Range<u32>) {
    for step in steps {
        clock.set_secs(f64::from(step) / 10.0);
        engine.process_frame(Frame::new(64, 64));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn tracked_session_is_scored_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("sessions.db")).unwrap();

    let clock = Arc::new(ManualClock::new());
    let perception = Perception {
        pose: Box::new(ScriptedPose(clock.clone())),
        face_mesh: Box::new(ScriptedMesh(clock.clone())),
        emotion: Box::new(AlwaysHappy),
    };
    let mut config = AnalyzerConfig::default();
    config.fusion.queue_poll_ms = 10;
    let engine = Arc::new(
        AttentionFusionEngine::new(config, perception, clock.clone())
            .with_audio(Arc::new(QuietRoom))
            .with_sink(Arc::new(SqliteSink::new(db.clone()))),
    );

    let context = engine.start("student-42").unwrap();
    assert_eq!(context.status, SessionStatus::Tracking);

    drive(&engine, &clock, 0..120);
    clock.set_secs(12.0);
    engine.pause().unwrap();
    drive(&engine, &clock, 120..150);
    clock.set_secs(15.0);
    engine.resume().unwrap();
    drive(&engine, &clock, 150..300);
    clock.set_secs(30.0);

    let stopper = Arc::clone(&engine);
    let summary = tokio::task::spawn_blocking(move || stopper.stop())
        .await
        .unwrap()
        .unwrap();

    // Samples at 1..=11, one on resuming at 15, then 16..=29.
    assert_eq!(summary.sample_count, 26);
    assert_eq!(summary.paused_secs, 3.0);
    assert_eq!(summary.tracked_secs, 27.0);
    let starts: Vec<f64> = summary.intervals.iter().map(|i| i.interval_start).collect();
    assert_eq!(starts, vec![0.0, 10.0, 20.0]);
    assert_eq!(summary.blink_count, 2);
    assert_eq!(summary.emotion_distribution.get("happy").copied(), Some(100.0));
    // Engaged until the pause at 12s, turned away from 15s on.
    assert!((summary.engaged_secs - 12.0).abs() < 1e-9);
    assert!((summary.distracted_secs - 15.0).abs() < 1e-9);
    assert!(summary.engaged_secs + summary.distracted_secs <= summary.tracked_secs + 1e-9);
    assert_eq!(summary.persisted_samples, 26);
    assert_eq!(summary.failed_samples, 0);
    assert_eq!(summary.mean_noise_db, Some(35.0));

    let timeline = engine.timeline();
    assert!(timeline.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    for sample in &timeline {
        assert_eq!(sample.face_attention, 85.0);
        assert_eq!(sample.noise_attention, 100.0);
        assert!((0.0..=100.0).contains(&sample.overall));
    }
    let late = timeline.iter().find(|s| s.timestamp >= 16.0).unwrap();
    assert_eq!(late.posture, 60.0);

    let stored = db.get_samples_for_session(&context.session_id).await.unwrap();
    assert_eq!(stored, timeline);
    let stored_intervals = db.get_intervals_for_session(&context.session_id).await.unwrap();
    assert_eq!(stored_intervals, summary.intervals);
    let session = db.get_session(&context.session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Stopped);
    assert_eq!(session.sample_count, 26);
    assert_eq!(session.paused_ms, 3_000);
    let restored = db
        .get_session_summary(&context.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.persisted_samples, 26);
}

#[test]
fn latest_metrics_before_and_after_a_session() {
    let clock = Arc::new(ManualClock::new());
    let perception = Perception {
        pose: Box::new(ScriptedPose(clock.clone())),
        face_mesh: Box::new(ScriptedMesh(clock.clone())),
        emotion: Box::new(AlwaysHappy),
    };
    let engine = AttentionFusionEngine::new(AnalyzerConfig::default(), perception, clock.clone());
    let defaults = engine.latest_metrics();
    assert_eq!(defaults.overall, 50.0);

    engine.start("").unwrap();
    drive(&engine, &clock, 0..20);
    let summary = engine.stop().unwrap();
    assert_eq!(summary.sample_count, 1);
    assert_eq!(summary.persisted_samples, 0);

    // Frames after stop are annotated but not scored.
    let before = engine.timeline().len();
    drive(&engine, &clock, 20..40);
    assert_eq!(engine.timeline().len(), before);
    assert!(engine.session().unwrap().status.is_stopped());
}

#[test]
fn stop_returns_when_the_microphone_hangs() {
    let clock = Arc::new(ManualClock::new());
    let perception = Perception {
        pose: Box::new(ScriptedPose(clock.clone())),
        face_mesh: Box::new(ScriptedMesh(clock.clone())),
        emotion: Box::new(AlwaysHappy),
    };
    let mut config = AnalyzerConfig::default();
    config.fusion.join_timeout_ms = 200;
    let engine = AttentionFusionEngine::new(config, perception, clock.clone())
        .with_audio(Arc::new(StuckMicrophone));

    engine.start("student-7").unwrap();
    drive(&engine, &clock, 0..15);

    let started = Instant::now();
    let summary = engine.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(summary.sample_count, 1);
    assert_eq!(summary.mean_noise_db, None);
    assert!(engine.noise_records().is_empty());
}

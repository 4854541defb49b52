use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::clock::{SessionClock, SessionTimer};
use crate::config::AnalyzerConfig;
use crate::emotion::EmotionAdapter;
use crate::eyes::{EyeMetrics, EyeSignalProcessor, DEFAULT_EAR};
use crate::models::{
    Channel, ChannelScores, EyeReading, FusedMetrics, IntervalSummary, NoiseRecord, Sample,
    SessionContext, SessionSummary, SummaryInputs,
};
use crate::noise::{AudioDevice, NoiseBuffer, NoiseMonitor};
use crate::perception::{EmotionClassifier, FaceMeshProvider, Frame, PoseLandmarkProvider};
use crate::persistence::{PersistCommand, PersistQueue, PersistenceSink, PersistenceWorker};
use crate::posture::{PostureAnalysis, PostureAnalyzer};
use crate::{log_debug, log_error, log_info, log_warn};

use super::interval::IntervalAggregator;
use super::overlay::annotate;
use super::timeline::{SampleSchedule, Timeline};

const ENABLE_LOGS: bool = true;

/// Eye-channel attention when no face is visible.
const DEFAULT_EYE_ATTENTION: f64 = 50.0;
/// Sampled gaze (0-100) when no face is visible.
const DEFAULT_GAZE: f64 = 50.0;
/// Slack for float rounding when comparing session times.
const TIME_EPSILON: f64 = 1e-6;

/// The external perception models driven on each processed frame.
pub struct Perception {
    pub pose: Box<dyn PoseLandmarkProvider>,
    pub face_mesh: Box<dyn FaceMeshProvider>,
    pub emotion: Box<dyn EmotionClassifier>,
}

/// Frame-path state. Only the frame-driving context locks it during a
/// session; `start`, `stop` and calibration lock it between frames.
struct Pipeline {
    pose: Box<dyn PoseLandmarkProvider>,
    face_mesh: Box<dyn FaceMeshProvider>,
    posture: PostureAnalyzer,
    eyes: EyeSignalProcessor,
    emotion: EmotionAdapter,
    intervals: IntervalAggregator,
    schedule: SampleSchedule,
    calibration: Option<(f64, f64)>,
    last_processed: Option<f64>,
    /// Eye metrics of the last processed frame, `None` when it had no face.
    eye: Option<EyeMetrics>,
    ids: Option<SessionIds>,
    queue: Option<PersistQueue>,
}

/// Copy of the session identity so the frame path never takes the
/// session lock.
struct SessionIds {
    subject_id: String,
    session_id: String,
}

impl Pipeline {
    fn reset(&mut self, config: &AnalyzerConfig) -> Result<()> {
        self.posture = PostureAnalyzer::new(config.posture.clone());
        self.eyes = EyeSignalProcessor::new(config.eyes.clone());
        if let Some((open, closed)) = self.calibration {
            self.eyes.calibrate(open, closed)?;
        }
        self.emotion.reset();
        self.intervals.reset();
        self.schedule.reset();
        self.last_processed = None;
        self.eye = None;
        self.ids = None;
        self.queue = None;
        Ok(())
    }

    fn enqueue(&self, command: PersistCommand) {
        if let Some(queue) = &self.queue {
            if let Err(err) = queue.enqueue(command) {
                log_warn!("dropping persistence command: {err:#}");
            }
        }
    }
}

#[derive(Default)]
struct Workers {
    noise: Option<NoiseMonitor>,
    persistence: Option<PersistenceWorker>,
}

/// Fuses posture, eye, emotion and noise channels into one attention
/// score per processed frame, and owns the session lifecycle.
///
/// All methods take `&self`; the engine can be shared behind an `Arc`
/// between the frame driver and readers of the timeline.
pub struct AttentionFusionEngine {
    config: AnalyzerConfig,
    clock: Arc<dyn SessionClock>,
    timer: Arc<SessionTimer>,
    audio: Option<Arc<dyn AudioDevice>>,
    sink: Option<Arc<dyn PersistenceSink>>,
    tracking: AtomicBool,
    session: RwLock<Option<SessionContext>>,
    pipeline: Mutex<Pipeline>,
    timeline: Timeline,
    noise: NoiseBuffer,
    latest: RwLock<FusedMetrics>,
    latest_posture: RwLock<Option<PostureAnalysis>>,
    eye_readings: RwLock<Vec<EyeReading>>,
    workers: Mutex<Workers>,
}

impl AttentionFusionEngine {
    pub fn new(
        config: AnalyzerConfig,
        perception: Perception,
        clock: Arc<dyn SessionClock>,
    ) -> Self {
        let pipeline = Pipeline {
            pose: perception.pose,
            face_mesh: perception.face_mesh,
            posture: PostureAnalyzer::new(config.posture.clone()),
            eyes: EyeSignalProcessor::new(config.eyes.clone()),
            emotion: EmotionAdapter::new(perception.emotion, config.emotion.clone()),
            intervals: IntervalAggregator::new(config.fusion.interval_len_secs),
            schedule: SampleSchedule::new(config.fusion.sample_interval_secs),
            calibration: None,
            last_processed: None,
            eye: None,
            ids: None,
            queue: None,
        };

        Self {
            config,
            clock,
            timer: Arc::new(SessionTimer::new()),
            audio: None,
            sink: None,
            tracking: AtomicBool::new(false),
            session: RwLock::new(None),
            pipeline: Mutex::new(pipeline),
            timeline: Timeline::new(),
            noise: NoiseBuffer::new(),
            latest: RwLock::new(FusedMetrics::default()),
            latest_posture: RwLock::new(None),
            eye_readings: RwLock::new(Vec::new()),
            workers: Mutex::new(Workers::default()),
        }
    }

    pub fn with_audio(mut self, device: Arc<dyn AudioDevice>) -> Self {
        self.audio = Some(device);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn pipeline(&self) -> MutexGuard<'_, Pipeline> {
        self.pipeline.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn now_secs(&self) -> f64 {
        self.timer.elapsed_secs(self.clock.as_ref())
    }

    /// Begin a new session for `subject_id`. Clears the previous session's
    /// data, then starts the persistence worker and the noise monitor.
    pub fn start(&self, subject_id: &str) -> Result<SessionContext> {
        let mut session = self.session.write().unwrap_or_else(|p| p.into_inner());
        if session.as_ref().is_some_and(|s| !s.status.is_stopped()) {
            bail!("session already active");
        }
        let subject_id = subject_id.trim();
        if self.sink.is_some() && subject_id.is_empty() {
            bail!("subject id is required when a persistence sink is configured");
        }

        let context = SessionContext::begin(
            subject_id.to_string(),
            Uuid::new_v4().to_string(),
            Utc::now(),
        );

        let mut pipeline = self.pipeline();
        pipeline.reset(&self.config)?;
        self.timeline.clear();
        self.noise.clear();
        self.eye_readings
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
        *self.latest.write().unwrap_or_else(|p| p.into_inner()) = FusedMetrics::default();
        *self.latest_posture.write().unwrap_or_else(|p| p.into_inner()) = None;
        self.timer.rebase(self.clock.as_ref());

        let mut workers = self.workers.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(sink) = &self.sink {
            let worker =
                PersistenceWorker::spawn(Arc::clone(sink), self.config.fusion.queue_poll())?;
            worker.enqueue(PersistCommand::Open(context.clone()))?;
            pipeline.queue = Some(worker.queue());
            workers.persistence = Some(worker);
        }
        if let Some(device) = &self.audio {
            match NoiseMonitor::spawn(
                device.as_ref(),
                self.config.noise.clone(),
                Arc::clone(&self.clock),
                Arc::clone(&self.timer),
                self.noise.clone(),
            ) {
                Ok(monitor) => workers.noise = Some(monitor),
                Err(err) => log_warn!("noise channel disabled for this session: {err:#}"),
            }
        }

        pipeline.ids = Some(SessionIds {
            subject_id: context.subject_id.clone(),
            session_id: context.session_id.clone(),
        });
        *session = Some(context.clone());
        self.tracking.store(true, Ordering::SeqCst);
        log_info!(
            "session {} started for subject '{}'",
            context.session_id,
            context.subject_id
        );
        Ok(context)
    }

    pub fn pause(&self) -> Result<()> {
        let now = self.now_secs();
        let mut session = self.session.write().unwrap_or_else(|p| p.into_inner());
        let context = active_session(&mut session)?;
        if context.pause(now) {
            self.tracking.store(false, Ordering::SeqCst);
            self.pipeline().posture.suspend(now);
            log_info!("session {} paused at {:.1}s", context.session_id, now);
        }
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let now = self.now_secs();
        let mut session = self.session.write().unwrap_or_else(|p| p.into_inner());
        let context = active_session(&mut session)?;
        if context.resume(now) {
            self.pipeline().posture.resume(now);
            self.tracking.store(true, Ordering::SeqCst);
            log_info!("session {} resumed at {:.1}s", context.session_id, now);
        }
        Ok(())
    }

    /// Score one frame and return it annotated. Frames arriving while no
    /// session is tracking are annotated with the last metrics and
    /// otherwise discarded.
    pub fn process_frame(&self, mut frame: Frame) -> Frame {
        if !self.tracking.load(Ordering::SeqCst) {
            return self.untracked_frame(frame);
        }

        let now = self.now_secs();
        let mut pipeline = self.pipeline();
        // pause() and stop() may have cleared the flag while this frame
        // waited for the lock.
        if !self.tracking.load(Ordering::SeqCst) {
            drop(pipeline);
            return self.untracked_frame(frame);
        }

        let min_gap = self.config.fusion.process_interval_secs();
        let throttled = pipeline
            .last_processed
            .is_some_and(|last| now - last + TIME_EPSILON < min_gap);
        let metrics = if throttled {
            self.latest_metrics()
        } else {
            pipeline.last_processed = Some(now);
            self.fuse(&mut pipeline, &frame, now)
        };

        if pipeline.schedule.due(now) {
            self.append_sample(&pipeline, &metrics, now);
        }
        drop(pipeline);

        annotate(&mut frame, &metrics, true);
        frame
    }

    fn untracked_frame(&self, mut frame: Frame) -> Frame {
        let metrics = self.latest_metrics();
        annotate(&mut frame, &metrics, false);
        frame
    }

    fn fuse(&self, pipeline: &mut Pipeline, frame: &Frame, now: f64) -> FusedMetrics {
        let pose = pipeline.pose.detect(frame).unwrap_or_else(|err| {
            log_warn!("pose detection failed: {err:#}");
            None
        });
        let posture = pipeline.posture.analyze(pose.as_ref(), now);

        let mesh = pipeline.face_mesh.detect(frame).unwrap_or_else(|err| {
            log_warn!("face mesh detection failed: {err:#}");
            None
        });
        let eye = mesh.as_ref().and_then(|mesh| {
            pipeline
                .eyes
                .process(mesh, f64::from(frame.width()), f64::from(frame.height()), now)
        });
        pipeline.eye = eye;
        if let Some(eye) = &eye {
            self.eye_readings
                .write()
                .unwrap_or_else(|p| p.into_inner())
                .push(eye.reading(now));
        }

        let emotion = pipeline.emotion.observe(frame, now);
        let noise = self.noise.latest_attention();

        let scores = ChannelScores::new(
            posture.score,
            eye.map_or(DEFAULT_EYE_ATTENTION, |e| e.attention),
            emotion.weight,
            noise,
        );
        let metrics = FusedMetrics {
            overall: scores.weighted_sum(&self.config.fusion.weights),
            scores,
            emotion: emotion.label,
        };
        log_debug!("fused {:.1} at {:.2}s", metrics.overall, now);

        if let Some(summary) = pipeline.intervals.observe(now, metrics.overall) {
            self.record_interval(pipeline, summary);
        }

        *self.latest.write().unwrap_or_else(|p| p.into_inner()) = metrics.clone();
        *self.latest_posture.write().unwrap_or_else(|p| p.into_inner()) = Some(posture);
        metrics
    }

    fn record_interval(&self, pipeline: &Pipeline, summary: IntervalSummary) {
        self.timeline.push_interval(summary.clone());
        if let Some(ids) = &pipeline.ids {
            pipeline.enqueue(PersistCommand::Interval {
                session_id: ids.session_id.clone(),
                interval: summary,
            });
        }
    }

    fn append_sample(&self, pipeline: &Pipeline, metrics: &FusedMetrics, now: f64) {
        let eye = pipeline.eye;
        let sample = Sample {
            timestamp: now,
            posture: metrics.scores[Channel::Posture],
            eye_attention: metrics.scores[Channel::Eye],
            face_attention: metrics.scores[Channel::Face],
            noise_attention: metrics.scores[Channel::Noise],
            overall: metrics.overall,
            emotion: metrics.emotion,
            gaze_score: eye.map_or(DEFAULT_GAZE, |e| e.gaze_score * 100.0),
            blink_rate: eye.map_or(0.0, |e| e.blink_rate),
            ear_value: eye.map_or(DEFAULT_EAR, |e| e.ear),
        };
        self.timeline.push_sample(sample.clone());

        if let Some(ids) = &pipeline.ids {
            pipeline.enqueue(PersistCommand::Store {
                subject_id: ids.subject_id.clone(),
                session_id: ids.session_id.clone(),
                sample,
            });
        }
    }

    /// End the session: flush the partial interval, stop both workers and
    /// return the session statistics. Data stays readable until the next
    /// `start`.
    pub fn stop(&self) -> Result<SessionSummary> {
        let now = self.now_secs();
        let mut session = self.session.write().unwrap_or_else(|p| p.into_inner());
        let context = active_session(&mut session)?;
        self.tracking.store(false, Ordering::SeqCst);
        context.finish(now);
        let context = context.clone();
        drop(session);

        let mut pipeline = self.pipeline();
        if let Some(summary) = pipeline.intervals.finish() {
            self.record_interval(&pipeline, summary);
        }
        let (engaged_secs, distracted_secs) = pipeline.posture.durations(now);
        let blink_count = pipeline.eyes.blink_count();

        let mut workers = self.workers.lock().unwrap_or_else(|p| p.into_inner());
        let join_timeout = self.config.fusion.join_timeout();
        if let Some(mut monitor) = workers.noise.take() {
            monitor.stop(join_timeout);
        }

        let samples = self.timeline.samples();
        let intervals = self.timeline.intervals();
        let eye_readings = self.eye_readings();
        let noise = self.noise.snapshot();
        let mut summary = SessionSummary::build(
            context.subject_id.clone(),
            context.session_id.clone(),
            context.started_at,
            Utc::now(),
            now,
            context.paused_secs(now),
            SummaryInputs {
                samples: &samples,
                intervals: &intervals,
                eye_readings: &eye_readings,
                noise: &noise,
                blink_count,
                engaged_secs,
                distracted_secs,
            },
            0,
            0,
        );

        if let Some(mut worker) = workers.persistence.take() {
            pipeline.enqueue(PersistCommand::Close(Box::new(summary.clone())));
            pipeline.queue = None;
            if !worker.shutdown(join_timeout) {
                log_error!("persistence worker did not drain before timeout");
            }
            let stats = worker.stats();
            summary.persisted_samples = stats.persisted();
            summary.failed_samples = stats.failed();
        }

        log_info!(
            "session {} stopped after {:.1}s: {} samples, {} intervals, mean {:.1}",
            summary.session_id,
            summary.duration_secs,
            summary.sample_count,
            summary.intervals.len(),
            summary.overall_mean
        );
        Ok(summary)
    }

    /// Set the blink threshold from a recorded open/closed EAR pair. The
    /// calibration carries over to later sessions.
    pub fn calibrate_eyes(&self, open_ear: f64, closed_ear: f64) -> Result<f64> {
        let mut pipeline = self.pipeline();
        let threshold = pipeline.eyes.calibrate(open_ear, closed_ear)?;
        pipeline.calibration = Some((open_ear, closed_ear));
        log_info!("blink threshold calibrated to {threshold:.3}");
        Ok(threshold)
    }

    pub fn timeline(&self) -> Vec<Sample> {
        self.timeline.samples()
    }

    pub fn intervals(&self) -> Vec<IntervalSummary> {
        self.timeline.intervals()
    }

    pub fn noise_records(&self) -> Vec<NoiseRecord> {
        self.noise.snapshot()
    }

    pub fn eye_readings(&self) -> Vec<EyeReading> {
        self.eye_readings
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn latest_metrics(&self) -> FusedMetrics {
        self.latest.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Posture analysis from the most recent processed frame.
    pub fn latest_posture(&self) -> Option<PostureAnalysis> {
        self.latest_posture
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn session(&self) -> Option<SessionContext> {
        self.session.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

fn active_session(session: &mut Option<SessionContext>) -> Result<&mut SessionContext> {
    session
        .as_mut()
        .filter(|s| !s.status.is_stopped())
        .ok_or_else(|| anyhow!("no active session"))
}

impl Drop for AttentionFusionEngine {
    fn drop(&mut self) {
        if self.session().is_some_and(|s| !s.status.is_stopped()) {
            if let Err(err) = self.stop() {
                log_error!("failed to stop session on drop: {err:#}");
            }
        }
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::{Channel, ChannelScores};
use super::sample::{EyeReading, IntervalSummary, NoiseRecord, Sample};

/// Final statistics returned by `stop()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub subject_id: String,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub tracked_secs: f64,
    pub paused_secs: f64,
    pub sample_count: usize,
    /// Mean of each channel over the timeline; zero when no samples exist.
    pub channel_means: ChannelScores,
    pub overall_mean: f64,
    /// Share of samples per emotion label, in percent.
    pub emotion_distribution: BTreeMap<String, f64>,
    pub intervals: Vec<IntervalSummary>,
    pub blink_count: usize,
    pub mean_blink_rate: f64,
    pub mean_gaze_score: f64,
    pub mean_ear: f64,
    pub mean_noise_db: Option<f64>,
    pub peak_noise_db: Option<f64>,
    pub engaged_secs: f64,
    pub distracted_secs: f64,
    pub persisted_samples: u64,
    pub failed_samples: u64,
}

/// Inputs gathered by the engine at stop time.
pub struct SummaryInputs<'a> {
    pub samples: &'a [Sample],
    pub intervals: &'a [IntervalSummary],
    pub eye_readings: &'a [EyeReading],
    pub noise: &'a [NoiseRecord],
    pub blink_count: usize,
    pub engaged_secs: f64,
    pub distracted_secs: f64,
}

pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

pub fn channel_means(samples: &[Sample]) -> ChannelScores {
    let mut means = ChannelScores::default();
    for channel in Channel::ALL {
        means[channel] = mean(samples.iter().map(|s| s.channel(channel))).unwrap_or(0.0);
    }
    means
}

pub fn emotion_distribution(samples: &[Sample]) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for sample in samples {
        *counts.entry(sample.emotion.as_str().to_string()).or_default() += 1;
    }
    let total = samples.len().max(1) as f64;
    counts
        .into_iter()
        .map(|(label, count)| (label, count as f64 / total * 100.0))
        .collect()
}

impl SessionSummary {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        subject_id: String,
        session_id: String,
        started_at: DateTime<Utc>,
        stopped_at: DateTime<Utc>,
        duration_secs: f64,
        paused_secs: f64,
        inputs: SummaryInputs<'_>,
        persisted_samples: u64,
        failed_samples: u64,
    ) -> Self {
        let samples = inputs.samples;
        Self {
            subject_id,
            session_id,
            started_at,
            stopped_at,
            duration_secs,
            tracked_secs: (duration_secs - paused_secs).max(0.0),
            paused_secs,
            sample_count: samples.len(),
            channel_means: channel_means(samples),
            overall_mean: mean(samples.iter().map(|s| s.overall)).unwrap_or(0.0),
            emotion_distribution: emotion_distribution(samples),
            intervals: inputs.intervals.to_vec(),
            blink_count: inputs.blink_count,
            mean_blink_rate: mean(inputs.eye_readings.iter().map(|r| r.blink_rate)).unwrap_or(0.0),
            mean_gaze_score: mean(inputs.eye_readings.iter().map(|r| r.gaze_score * 100.0))
                .unwrap_or(0.0),
            mean_ear: mean(inputs.eye_readings.iter().map(|r| r.ear_value)).unwrap_or(0.0),
            mean_noise_db: mean(inputs.noise.iter().map(|r| r.db_level)),
            peak_noise_db: inputs
                .noise
                .iter()
                .map(|r| r.db_level)
                .fold(None, |peak: Option<f64>, db| Some(peak.map_or(db, |p| p.max(db)))),
            engaged_secs: inputs.engaged_secs,
            distracted_secs: inputs.distracted_secs,
            persisted_samples,
            failed_samples,
        }
    }
}

pub mod clock;
pub mod config;
pub mod db;
pub mod emotion;
pub mod eyes;
pub mod fusion;
pub mod models;
pub mod noise;
pub mod perception;
pub mod persistence;
pub mod posture;
pub mod simulate;
pub mod utils;

pub use clock::{ManualClock, MonotonicClock, SessionClock};
pub use config::AnalyzerConfig;
pub use db::{Database, SqliteSink};
pub use fusion::{AttentionFusionEngine, Perception};
pub use models::{
    Channel, ChannelScores, FusedMetrics, IntervalSummary, NoiseRecord, Sample, SessionContext,
    SessionStatus, SessionSummary,
};
pub use noise::{AudioDevice, AudioStream};
pub use persistence::PersistenceSink;
pub use utils::init_logging;

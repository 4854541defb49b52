//! Channel fusion, session timeline and interval aggregation.

mod engine;
pub mod interval;
pub mod overlay;
pub mod timeline;

pub use engine::{AttentionFusionEngine, Perception};
pub use interval::IntervalAggregator;
pub use timeline::{SampleSchedule, Timeline};

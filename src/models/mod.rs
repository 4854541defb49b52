pub mod channel;
pub mod pause;
pub mod sample;
pub mod session;
pub mod summary;

pub use channel::{Channel, ChannelScores};
pub use pause::PauseSpan;
pub use sample::{EyeReading, FusedMetrics, IntervalSummary, NoiseRecord, Sample};
pub use session::{SessionContext, SessionStatus};
pub use summary::{SessionSummary, SummaryInputs};

pub mod logging;
pub mod rolling;
pub mod thread;

pub use logging::init_logging;
pub use rolling::RollingMean;
pub use thread::join_with_timeout;

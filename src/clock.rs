//! Session time sources.
//!
//! Every throttle, window and timestamp in the pipeline is expressed in
//! seconds since session start. The engine asks a [`SessionClock`] for the
//! current instant and rebases it on `start()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A monotonic time source shared by the frame driver and the noise thread.
pub trait SessionClock: Send + Sync {
    /// Time elapsed since the clock's own epoch.
    fn now(&self) -> Duration;
}

/// Wall-clock implementation backed by [`Instant`].
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Manually advanced clock for deterministic drivers and tests.
#[derive(Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_secs(&self, secs: f64) {
        let micros = (secs.max(0.0) * 1_000_000.0).round() as u64;
        self.micros.store(micros, Ordering::SeqCst);
    }
}

impl SessionClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Session-relative view over a [`SessionClock`].
///
/// Shared between the engine and the noise thread so both stamp records on
/// the same axis.
pub struct SessionTimer {
    anchor: Mutex<Duration>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self {
            anchor: Mutex::new(Duration::ZERO),
        }
    }

    pub fn rebase(&self, clock: &dyn SessionClock) {
        let mut anchor = self.anchor.lock().unwrap_or_else(|p| p.into_inner());
        *anchor = clock.now();
    }

    /// Seconds since the last rebase.
    pub fn elapsed_secs(&self, clock: &dyn SessionClock) -> f64 {
        let anchor = *self.anchor.lock().unwrap_or_else(|p| p.into_inner());
        clock.now().saturating_sub(anchor).as_secs_f64()
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_rounds_to_microseconds() {
        let clock = ManualClock::new();
        clock.set_secs(1.75);
        assert_eq!(clock.now(), Duration::from_millis(1750));
        clock.set_secs(-2.0);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn session_timer_is_relative_to_rebase() {
        let clock = ManualClock::new();
        clock.set_secs(100.0);
        let timer = SessionTimer::new();
        timer.rebase(&clock);
        clock.set_secs(103.0);
        assert!((timer.elapsed_secs(&clock) - 3.0).abs() < 1e-9);
    }
}

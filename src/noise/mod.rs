//! Ambient noise channel.
//!
//! A dedicated thread pulls fixed-size PCM chunks from an [`AudioDevice`],
//! converts each chunk to a decibel estimate and appends a [`NoiseRecord`]
//! to a shared buffer. Fusion only ever reads the most recent record.

pub mod level;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::clock::{SessionClock, SessionTimer};
use crate::config::NoiseConfig;
use crate::models::NoiseRecord;
use crate::utils::join_with_timeout;
use crate::{log_error, log_info};

pub use level::{decibels, noise_attention};

const ENABLE_LOGS: bool = true;

/// Attention reported while no noise record exists.
pub const DEFAULT_NOISE_ATTENTION: f64 = 100.0;

/// Opens a capture stream. Called once per session start.
pub trait AudioDevice: Send + Sync {
    fn open(&self, config: &NoiseConfig) -> Result<Box<dyn AudioStream>>;
}

/// A blocking source of mono 16-bit PCM chunks.
pub trait AudioStream: Send {
    fn read_chunk(&mut self) -> Result<Vec<i16>>;
}

/// Append-only record store written by the noise thread.
#[derive(Clone, Default)]
pub struct NoiseBuffer {
    records: Arc<RwLock<Vec<NoiseRecord>>>,
}

impl NoiseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: NoiseRecord) {
        self.records
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(record);
    }

    pub fn latest(&self) -> Option<NoiseRecord> {
        self.records
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .last()
            .copied()
    }

    pub fn latest_attention(&self) -> f64 {
        self.latest()
            .map(|r| r.attention)
            .unwrap_or(DEFAULT_NOISE_ATTENTION)
    }

    pub fn snapshot(&self) -> Vec<NoiseRecord> {
        self.records.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

/// Handle to a running noise thread.
pub struct NoiseMonitor {
    recording: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl NoiseMonitor {
    /// Open the device and start sampling into `buffer`.
    ///
    /// A device that fails to open is reported here so the caller can run
    /// the session without a noise channel.
    pub fn spawn(
        device: &dyn AudioDevice,
        config: NoiseConfig,
        clock: Arc<dyn SessionClock>,
        timer: Arc<SessionTimer>,
        buffer: NoiseBuffer,
    ) -> Result<Self> {
        let mut stream = device
            .open(&config)
            .context("Failed to open audio input device")?;

        let recording = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&recording);

        let handle = thread::Builder::new()
            .name("noise-monitor".to_string())
            .spawn(move || {
                log_info!(
                    "noise monitor started ({} samples @ {}Hz)",
                    config.chunk_size,
                    config.sample_rate
                );
                while flag.load(Ordering::SeqCst) {
                    let chunk = match stream.read_chunk() {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            log_error!("audio read failed, noise channel stopped: {err:#}");
                            break;
                        }
                    };
                    if !flag.load(Ordering::SeqCst) {
                        break;
                    }
                    let db_level = decibels(&chunk, &config);
                    buffer.push(NoiseRecord {
                        timestamp: timer.elapsed_secs(clock.as_ref()),
                        db_level,
                        attention: noise_attention(db_level),
                    });
                }
                log_info!("noise monitor stopped");
            })
            .context("Failed to spawn noise monitor thread")?;

        Ok(Self {
            recording,
            handle: Some(handle),
        })
    }

    /// Clear the recording flag and wait up to `timeout` for the thread.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.recording.store(false, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => join_with_timeout(handle, timeout, "noise-monitor"),
            None => true,
        }
    }
}

impl Drop for NoiseMonitor {
    fn drop(&mut self) {
        self.recording.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use anyhow::bail;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of chunks, then fails like an unplugged device.
    pub(crate) struct ScriptedDevice {
        chunks: Mutex<Option<VecDeque<Vec<i16>>>>,
        fail_open: bool,
    }

    impl ScriptedDevice {
        pub(crate) fn new(chunks: Vec<Vec<i16>>) -> Self {
            Self {
                chunks: Mutex::new(Some(chunks.into())),
                fail_open: false,
            }
        }

        pub(crate) fn broken() -> Self {
            Self {
                chunks: Mutex::new(None),
                fail_open: true,
            }
        }
    }

    struct ScriptedStream {
        chunks: VecDeque<Vec<i16>>,
    }

    impl AudioStream for ScriptedStream {
        fn read_chunk(&mut self) -> Result<Vec<i16>> {
            match self.chunks.pop_front() {
                Some(chunk) => Ok(chunk),
                None => bail!("device unplugged"),
            }
        }
    }

    impl AudioDevice for ScriptedDevice {
        fn open(&self, _config: &NoiseConfig) -> Result<Box<dyn AudioStream>> {
            if self.fail_open {
                bail!("no input device");
            }
            let chunks = self.chunks.lock().unwrap().take().unwrap_or_default();
            Ok(Box::new(ScriptedStream { chunks }))
        }
    }

    fn wait_for_exit(monitor: &NoiseMonitor) {
        for _ in 0..200 {
            if monitor.handle.as_ref().map_or(true, |h| h.is_finished()) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("noise thread did not exit");
    }

    #[test]
    fn records_every_chunk_until_read_error() {
        let device = ScriptedDevice::new(vec![vec![0; 64], vec![0; 64], vec![0; 64]]);
        let clock = Arc::new(ManualClock::new());
        clock.set_secs(2.0);
        let timer = Arc::new(SessionTimer::new());
        let buffer = NoiseBuffer::new();

        let mut monitor = NoiseMonitor::spawn(
            &device,
            NoiseConfig::default(),
            clock,
            timer,
            buffer.clone(),
        )
        .unwrap();
        wait_for_exit(&monitor);
        assert!(monitor.stop(Duration::from_millis(100)));

        let records = buffer.snapshot();
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.db_level, 35.0);
            assert_eq!(record.attention, 100.0);
            assert_eq!(record.timestamp, 2.0);
        }
    }

    #[test]
    fn open_failure_is_reported_to_caller() {
        let device = ScriptedDevice::broken();
        let result = NoiseMonitor::spawn(
            &device,
            NoiseConfig::default(),
            Arc::new(ManualClock::new()),
            Arc::new(SessionTimer::new()),
            NoiseBuffer::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_buffer_defaults_to_full_attention() {
        let buffer = NoiseBuffer::new();
        assert_eq!(buffer.latest_attention(), DEFAULT_NOISE_ATTENTION);
        buffer.push(NoiseRecord {
            timestamp: 1.0,
            db_level: 72.0,
            attention: noise_attention(72.0),
        });
        assert_eq!(buffer.latest_attention(), 5.0);
    }
}

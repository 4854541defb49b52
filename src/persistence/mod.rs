//! Asynchronous hand-off from the frame path to a storage backend.
//!
//! The engine enqueues [`PersistCommand`]s on an unbounded channel and
//! returns immediately. A single worker thread forwards them to the
//! configured [`PersistenceSink`]. Sink errors are logged and counted and
//! never stop the worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::models::{IntervalSummary, Sample, SessionContext, SessionSummary};
use crate::utils::join_with_timeout;
use crate::{log_debug, log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Storage backend for session data. Every call is acknowledged with a
/// `Result`; failures are reported but do not abort the session.
pub trait PersistenceSink: Send + Sync {
    fn open_session(&self, _session: &SessionContext) -> Result<()> {
        Ok(())
    }

    fn persist(&self, subject_id: &str, session_id: &str, sample: &Sample) -> Result<()>;

    fn persist_interval(&self, _session_id: &str, _interval: &IntervalSummary) -> Result<()> {
        Ok(())
    }

    fn close_session(&self, _summary: &SessionSummary) -> Result<()> {
        Ok(())
    }
}

pub enum PersistCommand {
    Open(SessionContext),
    Store {
        subject_id: String,
        session_id: String,
        sample: Sample,
    },
    Interval {
        session_id: String,
        interval: IntervalSummary,
    },
    Close(Box<SessionSummary>),
    Shutdown,
}

/// Counters shared between the worker and its handle.
#[derive(Debug, Default)]
pub struct PersistStats {
    persisted: AtomicU64,
    failed: AtomicU64,
}

impl PersistStats {
    pub fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Producer side of the queue, cloned into the frame path.
#[derive(Clone)]
pub struct PersistQueue {
    sender: Sender<PersistCommand>,
}

impl PersistQueue {
    /// Queue a command without blocking.
    pub fn enqueue(&self, command: PersistCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| anyhow!("persistence worker is no longer running"))
    }
}

pub struct PersistenceWorker {
    sender: Sender<PersistCommand>,
    stats: Arc<PersistStats>,
    handle: Option<JoinHandle<()>>,
}

impl PersistenceWorker {
    /// Start the consumer thread. `poll` bounds each wait on the queue.
    pub fn spawn(sink: Arc<dyn PersistenceSink>, poll: Duration) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<PersistCommand>();
        let stats = Arc::new(PersistStats::default());
        let worker_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("persistence-worker".into())
            .spawn(move || {
                log_info!("persistence worker started");
                loop {
                    let command = match receiver.recv_timeout(poll) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => {
                            log_warn!("persistence queue closed without shutdown");
                            break;
                        }
                    };
                    if !handle_command(sink.as_ref(), &worker_stats, command) {
                        break;
                    }
                }
                log_info!(
                    "persistence worker stopped ({} persisted, {} failed)",
                    worker_stats.persisted(),
                    worker_stats.failed()
                );
            })
            .context("failed to spawn persistence worker thread")?;

        Ok(Self {
            sender,
            stats,
            handle: Some(handle),
        })
    }

    pub fn queue(&self) -> PersistQueue {
        PersistQueue {
            sender: self.sender.clone(),
        }
    }

    pub fn enqueue(&self, command: PersistCommand) -> Result<()> {
        self.queue().enqueue(command)
    }

    pub fn stats(&self) -> Arc<PersistStats> {
        Arc::clone(&self.stats)
    }

    /// Push the shutdown sentinel and wait up to `timeout` for the queue
    /// to drain. Returns whether the worker was joined.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        if self.sender.send(PersistCommand::Shutdown).is_err() {
            log_warn!("persistence worker exited before shutdown");
        }
        match self.handle.take() {
            Some(handle) => join_with_timeout(handle, timeout, "persistence-worker"),
            None => true,
        }
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.sender.send(PersistCommand::Shutdown);
        }
    }
}

/// Returns false once the shutdown sentinel is seen.
fn handle_command(
    sink: &dyn PersistenceSink,
    stats: &PersistStats,
    command: PersistCommand,
) -> bool {
    match command {
        PersistCommand::Open(session) => {
            if let Err(err) = sink.open_session(&session) {
                log_error!("failed to open session {}: {err:#}", session.session_id);
            }
        }
        PersistCommand::Store {
            subject_id,
            session_id,
            sample,
        } => match sink.persist(&subject_id, &session_id, &sample) {
            Ok(()) => {
                stats.persisted.fetch_add(1, Ordering::SeqCst);
                log_debug!("persisted sample at {:.1}s", sample.timestamp);
            }
            Err(err) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                log_error!("failed to persist sample at {:.1}s: {err:#}", sample.timestamp);
            }
        },
        PersistCommand::Interval {
            session_id,
            interval,
        } => {
            if let Err(err) = sink.persist_interval(&session_id, &interval) {
                log_error!(
                    "failed to persist interval at {:.0}s: {err:#}",
                    interval.interval_start
                );
            }
        }
        PersistCommand::Close(mut summary) => {
            summary.persisted_samples = stats.persisted();
            summary.failed_samples = stats.failed();
            if let Err(err) = sink.close_session(&summary) {
                log_error!("failed to close session {}: {err:#}", summary.session_id);
            }
        }
        PersistCommand::Shutdown => return false,
    }
    true
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pause::PauseSpan;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Tracking,
    Paused,
    Stopped,
}

impl SessionStatus {
    pub fn is_stopped(&self) -> bool {
        *self == SessionStatus::Stopped
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Tracking => "Tracking",
            SessionStatus::Paused => "Paused",
            SessionStatus::Stopped => "Stopped",
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Tracking
    }
}

/// Identity and lifecycle of one tracking session.
///
/// Owned by the engine; callers receive clones. Times are seconds on the
/// session axis, except `started_at` which anchors the session in wall time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub subject_id: String,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub pauses: Vec<PauseSpan>,
}

impl SessionContext {
    pub fn begin(subject_id: String, session_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            subject_id,
            session_id,
            started_at,
            status: SessionStatus::Tracking,
            pauses: Vec::new(),
        }
    }

    /// Returns false when the session was not tracking.
    pub fn pause(&mut self, now_secs: f64) -> bool {
        if self.status != SessionStatus::Tracking {
            return false;
        }
        self.status = SessionStatus::Paused;
        self.pauses.push(PauseSpan::open(now_secs));
        true
    }

    /// Returns false when the session was not paused.
    pub fn resume(&mut self, now_secs: f64) -> bool {
        if self.status != SessionStatus::Paused {
            return false;
        }
        self.status = SessionStatus::Tracking;
        if let Some(span) = self.pauses.last_mut() {
            span.close(now_secs);
        }
        true
    }

    pub fn finish(&mut self, now_secs: f64) {
        if self.status == SessionStatus::Paused {
            if let Some(span) = self.pauses.last_mut() {
                span.close(now_secs);
            }
        }
        self.status = SessionStatus::Stopped;
    }

    pub fn paused_secs(&self, now_secs: f64) -> f64 {
        self.pauses
            .iter()
            .map(|span| span.duration_secs(now_secs))
            .sum()
    }

    /// Session time minus time spent paused.
    pub fn tracked_secs(&self, now_secs: f64) -> f64 {
        (now_secs - self.paused_secs(now_secs)).max(0.0)
    }
}

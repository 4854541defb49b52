//! Session rows as stored in the local database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{SessionContext, SessionStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub id: String,
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub duration_ms: u64,
    pub paused_ms: u64,
    pub sample_count: u64,
    pub overall_mean: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredSession {
    /// Row for a session that has just started.
    pub fn opened(context: &SessionContext) -> Self {
        Self {
            id: context.session_id.clone(),
            subject_id: context.subject_id.clone(),
            started_at: context.started_at,
            stopped_at: None,
            status: context.status,
            duration_ms: 0,
            paused_ms: 0,
            sample_count: 0,
            overall_mean: None,
            created_at: context.started_at,
            updated_at: context.started_at,
        }
    }
}

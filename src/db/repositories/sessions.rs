use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_optional_datetime, parse_status, secs_to_ms, to_i64, to_u64},
    models::StoredSession,
    Database,
};
use crate::models::SessionSummary;

const SESSION_COLUMNS: &str = "id, subject_id, started_at, stopped_at, status, duration_ms, paused_ms, sample_count, overall_mean, created_at, updated_at";

fn row_to_session(row: &Row) -> Result<StoredSession> {
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let status: String = row.get("status")?;
    let duration_ms: i64 = row.get("duration_ms")?;
    let paused_ms: i64 = row.get("paused_ms")?;
    let sample_count: i64 = row.get("sample_count")?;

    Ok(StoredSession {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "stopped_at")?,
        status: parse_status(&status)?,
        duration_ms: to_u64(duration_ms, "duration_ms")?,
        paused_ms: to_u64(paused_ms, "paused_ms")?,
        sample_count: to_u64(sample_count, "sample_count")?,
        overall_mean: row.get("overall_mean")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

pub(crate) fn insert_session(conn: &Connection, record: &StoredSession) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, subject_id, started_at, stopped_at, status, duration_ms, paused_ms, sample_count, overall_mean, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            record.id,
            record.subject_id,
            record.started_at.to_rfc3339(),
            record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
            record.status.as_str(),
            to_i64(record.duration_ms)?,
            to_i64(record.paused_ms)?,
            to_i64(record.sample_count)?,
            record.overall_mean,
            record.created_at.to_rfc3339(),
            record.updated_at.to_rfc3339(),
        ],
    )
    .context("failed to insert session")?;
    Ok(())
}

/// Write the closing statistics onto an existing session row.
pub(crate) fn finalize_session(conn: &Connection, summary: &SessionSummary) -> Result<()> {
    let summary_json =
        serde_json::to_string(summary).context("failed to serialize session summary")?;
    let rows_affected = conn
        .execute(
            "UPDATE sessions
             SET stopped_at = ?1,
                 status = 'Stopped',
                 duration_ms = ?2,
                 paused_ms = ?3,
                 sample_count = ?4,
                 overall_mean = ?5,
                 summary_json = ?6,
                 updated_at = ?7
             WHERE id = ?8",
            params![
                summary.stopped_at.to_rfc3339(),
                to_i64(secs_to_ms(summary.duration_secs))?,
                to_i64(secs_to_ms(summary.paused_secs))?,
                to_i64(summary.sample_count as u64)?,
                summary.overall_mean,
                summary_json,
                summary.stopped_at.to_rfc3339(),
                summary.session_id,
            ],
        )
        .context("failed to finalize session")?;

    if rows_affected == 0 {
        return Err(anyhow!("Session {} not found", summary.session_id));
    }
    Ok(())
}

impl Database {
    pub async fn get_session(&self, session_id: &str) -> Result<Option<StoredSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![session_id])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// The statistics recorded when the session was closed.
    pub async fn get_session_summary(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let raw: Option<Option<String>> = conn
                .query_row(
                    "SELECT summary_json FROM sessions WHERE id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?;
            raw.flatten()
                .map(|json| {
                    serde_json::from_str(&json).context("failed to parse stored session summary")
                })
                .transpose()
        })
        .await
    }

    /// Mark sessions left open by a crashed run as stopped. Returns how
    /// many rows were closed.
    pub async fn close_incomplete_sessions(&self, stopped_at: DateTime<Utc>) -> Result<usize> {
        self.execute(move |conn| {
            let closed = conn
                .execute(
                    "UPDATE sessions
                     SET status = 'Stopped',
                         stopped_at = ?1,
                         updated_at = ?1
                     WHERE stopped_at IS NULL",
                    params![stopped_at.to_rfc3339()],
                )
                .context("failed to close incomplete sessions")?;
            Ok(closed)
        })
        .await
    }

    pub async fn list_sessions_for_subject(&self, subject_id: &str) -> Result<Vec<StoredSession>> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE subject_id = ?1 ORDER BY started_at DESC"
            ))?;
            let mut rows = stmt.query(params![subject_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }
}

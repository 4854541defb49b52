use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::db::Database;
use crate::models::IntervalSummary;

/// A window is written once; a repeated start replaces the earlier value.
pub(crate) fn insert_interval(
    conn: &Connection,
    session_id: &str,
    interval: &IntervalSummary,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO intervals (session_id, interval_start, overall_attention)
         VALUES (?1, ?2, ?3)",
        params![session_id, interval.interval_start, interval.overall_attention],
    )
    .context("failed to insert interval summary")?;
    Ok(())
}

impl Database {
    pub async fn get_intervals_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<IntervalSummary>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT interval_start, overall_attention
                 FROM intervals
                 WHERE session_id = ?1
                 ORDER BY interval_start ASC",
            )?;
            let mut rows = stmt.query(params![session_id])?;
            let mut intervals = Vec::new();
            while let Some(row) = rows.next()? {
                intervals.push(IntervalSummary {
                    interval_start: row.get(0)?,
                    overall_attention: row.get(1)?,
                });
            }
            Ok(intervals)
        })
        .await
    }
}

use anyhow::Result;

use crate::db::{
    models::StoredSession,
    repositories::{intervals, samples, sessions},
    Database,
};
use crate::models::{IntervalSummary, Sample, SessionContext, SessionSummary};
use crate::persistence::PersistenceSink;

/// [`PersistenceSink`] backed by the local database. Called from the
/// persistence worker thread, so it uses the blocking entry point.
#[derive(Clone)]
pub struct SqliteSink {
    db: Database,
}

impl SqliteSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl PersistenceSink for SqliteSink {
    fn open_session(&self, session: &SessionContext) -> Result<()> {
        let record = StoredSession::opened(session);
        self.db
            .execute_blocking(move |conn| sessions::insert_session(conn, &record))
    }

    fn persist(&self, subject_id: &str, session_id: &str, sample: &Sample) -> Result<()> {
        let subject_id = subject_id.to_string();
        let session_id = session_id.to_string();
        let sample = sample.clone();
        self.db.execute_blocking(move |conn| {
            samples::insert_sample(conn, &subject_id, &session_id, &sample)
        })
    }

    fn persist_interval(&self, session_id: &str, interval: &IntervalSummary) -> Result<()> {
        let session_id = session_id.to_string();
        let interval = interval.clone();
        self.db
            .execute_blocking(move |conn| intervals::insert_interval(conn, &session_id, &interval))
    }

    fn close_session(&self, summary: &SessionSummary) -> Result<()> {
        let summary = summary.clone();
        self.db
            .execute_blocking(move |conn| sessions::finalize_session(conn, &summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Emotion;
    use crate::models::{SessionStatus, SummaryInputs};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("nested").join("attention.db")).unwrap();
        (dir, db)
    }

    fn sample(t: f64, overall: f64) -> Sample {
        Sample {
            timestamp: t,
            posture: 100.0,
            eye_attention: 80.0,
            face_attention: 90.0,
            noise_attention: 100.0,
            overall,
            emotion: Emotion::Happy,
            gaze_score: 64.0,
            blink_rate: 15.0,
            ear_value: 0.28,
        }
    }

    fn summary_for(context: &SessionContext, samples: &[Sample]) -> SessionSummary {
        SessionSummary::build(
            context.subject_id.clone(),
            context.session_id.clone(),
            context.started_at,
            Utc::now(),
            12.5,
            2.5,
            SummaryInputs {
                samples,
                intervals: &[],
                eye_readings: &[],
                noise: &[],
                blink_count: 3,
                engaged_secs: 10.0,
                distracted_secs: 0.0,
            },
            2,
            0,
        )
    }

    #[tokio::test]
    async fn sink_writes_are_readable() {
        let (_dir, db) = open_db();
        let sink = SqliteSink::new(db.clone());
        let context = SessionContext::begin("stu-7".into(), "sess-7".into(), Utc::now());
        let samples = vec![sample(1.0, 92.5), sample(2.0, 85.0)];
        let summary = summary_for(&context, &samples);

        let writer = {
            let context = context.clone();
            let samples = samples.clone();
            let summary = summary.clone();
            tokio::task::spawn_blocking(move || -> Result<()> {
                sink.open_session(&context)?;
                for s in &samples {
                    sink.persist(&context.subject_id, &context.session_id, s)?;
                }
                sink.persist_interval(
                    &context.session_id,
                    &IntervalSummary {
                        interval_start: 0.0,
                        overall_attention: 88.75,
                    },
                )?;
                sink.close_session(&summary)
            })
        };
        writer.await.unwrap().unwrap();

        let stored = db.get_samples_for_session("sess-7").await.unwrap();
        assert_eq!(stored, samples);

        let intervals = db.get_intervals_for_session("sess-7").await.unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].overall_attention, 88.75);

        let session = db.get_session("sess-7").await.unwrap().unwrap();
        assert_eq!(session.subject_id, "stu-7");
        assert_eq!(session.status, SessionStatus::Stopped);
        assert_eq!(session.duration_ms, 12_500);
        assert_eq!(session.paused_ms, 2_500);
        assert_eq!(session.sample_count, 2);
        assert!(session.stopped_at.is_some());

        let restored = db.get_session_summary("sess-7").await.unwrap().unwrap();
        assert_eq!(restored.blink_count, 3);
        assert_eq!(restored.overall_mean, summary.overall_mean);

        let listed = db.list_sessions_for_subject("stu-7").await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn sample_for_unknown_session_is_rejected() {
        let (_dir, db) = open_db();
        let orphan = sample(1.0, 50.0);
        let result = db
            .execute(move |conn| samples::insert_sample(conn, "stu", "missing", &orphan))
            .await;
        assert!(result.is_err());
        assert!(db.get_session("missing").await.unwrap().is_none());
        assert!(db.get_session_summary("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closing_unknown_session_fails() {
        let (_dir, db) = open_db();
        let context = SessionContext::begin("stu".into(), "ghost".into(), Utc::now());
        let summary = summary_for(&context, &[]);
        let result = db
            .execute(move |conn| sessions::finalize_session(conn, &summary))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn open_session_row_starts_empty() {
        let (_dir, db) = open_db();
        let context = SessionContext::begin("stu".into(), "fresh".into(), Utc::now());
        let record = StoredSession::opened(&context);
        db.execute(move |conn| sessions::insert_session(conn, &record))
            .await
            .unwrap();
        let stored = db.get_session("fresh").await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Tracking);
        assert_eq!(stored.overall_mean, None);
        assert_eq!(stored.stopped_at, None);
        assert!(db.get_samples_for_session("fresh").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn incomplete_sessions_are_closed_on_recovery() {
        let (_dir, db) = open_db();
        let context = SessionContext::begin("stu".into(), "crashed".into(), Utc::now());
        let record = StoredSession::opened(&context);
        db.execute(move |conn| sessions::insert_session(conn, &record))
            .await
            .unwrap();
        assert_eq!(db.close_incomplete_sessions(Utc::now()).await.unwrap(), 1);
        let stored = db.get_session("crashed").await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Stopped);
        assert_eq!(db.close_incomplete_sessions(Utc::now()).await.unwrap(), 0);
    }
}

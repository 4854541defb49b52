use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{helpers::parse_emotion, Database};
use crate::models::Sample;

fn row_to_sample(row: &Row) -> Result<Sample> {
    let emotion: String = row.get("emotion")?;
    Ok(Sample {
        timestamp: row.get("timestamp")?,
        posture: row.get("posture")?,
        eye_attention: row.get("eye_attention")?,
        face_attention: row.get("face_attention")?,
        noise_attention: row.get("noise_attention")?,
        overall: row.get("overall")?,
        emotion: parse_emotion(&emotion),
        gaze_score: row.get("gaze_score")?,
        blink_rate: row.get("blink_rate")?,
        ear_value: row.get("ear_value")?,
    })
}

pub(crate) fn insert_sample(
    conn: &Connection,
    subject_id: &str,
    session_id: &str,
    sample: &Sample,
) -> Result<()> {
    conn.execute(
        "INSERT INTO samples (
            session_id,
            subject_id,
            timestamp,
            posture,
            eye_attention,
            face_attention,
            noise_attention,
            overall,
            emotion,
            gaze_score,
            blink_rate,
            ear_value
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            session_id,
            subject_id,
            sample.timestamp,
            sample.posture,
            sample.eye_attention,
            sample.face_attention,
            sample.noise_attention,
            sample.overall,
            sample.emotion.as_str(),
            sample.gaze_score,
            sample.blink_rate,
            sample.ear_value,
        ],
    )
    .context("failed to insert sample")?;
    Ok(())
}

impl Database {
    pub async fn get_samples_for_session(&self, session_id: &str) -> Result<Vec<Sample>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    timestamp,
                    posture,
                    eye_attention,
                    face_attention,
                    noise_attention,
                    overall,
                    emotion,
                    gaze_score,
                    blink_rate,
                    ear_value
                FROM samples
                WHERE session_id = ?1
                ORDER BY timestamp ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut samples = Vec::new();
            while let Some(row) = rows.next()? {
                samples.push(row_to_sample(row)?);
            }
            Ok(samples)
        })
        .await
    }
}

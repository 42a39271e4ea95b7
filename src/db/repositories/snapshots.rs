use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_gaze_direction, to_i64, to_u64},
    models::AttentionSnapshot,
};

fn row_to_snapshot(row: &Row) -> Result<AttentionSnapshot> {
    let timestamp: String = row.get("timestamp")?;
    let gaze_direction: String = row.get("gaze_direction")?;
    let face_detected: i64 = row.get("face_detected")?;
    let face_count: i64 = row.get("face_count")?;

    Ok(AttentionSnapshot {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        seconds_elapsed: to_u64(row.get("seconds_elapsed")?, "seconds_elapsed")?,
        face_detected: face_detected != 0,
        face_count: face_count as u32,
        attention_score: row.get("attention_score")?,
        gaze_direction: parse_gaze_direction(&gaze_direction)?,
        head_yaw: row.get("head_yaw")?,
        head_pitch: row.get("head_pitch")?,
        iris_deviation: row.get("iris_deviation")?,
    })
}

impl Database {
    pub async fn insert_snapshot(&self, snapshot: &AttentionSnapshot) -> Result<()> {
        let record = snapshot.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO attention_snapshots (session_id, timestamp, seconds_elapsed,
                    face_detected, face_count, attention_score, gaze_direction,
                    head_yaw, head_pitch, iris_deviation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.session_id,
                    record.timestamp.to_rfc3339(),
                    to_i64(record.seconds_elapsed)?,
                    record.face_detected as i64,
                    i64::from(record.face_count),
                    record.attention_score,
                    record.gaze_direction.as_str(),
                    record.head_yaw,
                    record.head_pitch,
                    record.iris_deviation,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_snapshots_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<AttentionSnapshot>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, timestamp, seconds_elapsed, face_detected,
                        face_count, attention_score, gaze_direction, head_yaw,
                        head_pitch, iris_deviation
                 FROM attention_snapshots
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut snapshots = Vec::new();
            while let Some(row) = rows.next()? {
                snapshots.push(row_to_snapshot(row)?);
            }

            Ok(snapshots)
        })
        .await
    }

    /// Mean persisted attention score; `None` when the session has no
    /// snapshots (finalize then defaults to 100).
    pub async fn get_average_attention(&self, session_id: &str) -> Result<Option<f64>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let average: Option<f64> = conn.query_row(
                "SELECT AVG(attention_score) FROM attention_snapshots WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            Ok(average)
        })
        .await
    }
}

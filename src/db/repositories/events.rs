use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_severity, parse_violation_kind},
    models::{ProctoringEvent, ViolationCounts, ViolationKind},
};

fn row_to_event(row: &Row) -> Result<ProctoringEvent> {
    let kind: String = row.get("kind")?;
    let timestamp: String = row.get("timestamp")?;
    let severity: String = row.get("severity")?;
    let metadata_json: String = row.get("metadata")?;
    let question_index: Option<i64> = row.get("question_index")?;

    Ok(ProctoringEvent {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        kind: parse_violation_kind(&kind)?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        confidence: row.get("confidence")?,
        severity: parse_severity(&severity)?,
        message: row.get("message")?,
        metadata: serde_json::from_str(&metadata_json)?,
        question_index: question_index.map(|idx| idx as u32),
    })
}

impl Database {
    /// Persist one flushed batch in a single transaction; either all
    /// events of the batch land or none do.
    pub async fn insert_events(&self, events: &[ProctoringEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let records = events.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO proctoring_events (id, session_id, kind, timestamp,
                        confidence, severity, message, metadata, question_index)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;

                for record in &records {
                    stmt.execute(params![
                        record.id,
                        record.session_id,
                        record.kind.as_str(),
                        record.timestamp.to_rfc3339(),
                        record.confidence,
                        record.severity.as_str(),
                        record.message,
                        serde_json::to_string(&record.metadata)?,
                        record.question_index.map(i64::from),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_events_for_session(&self, session_id: &str) -> Result<Vec<ProctoringEvent>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, kind, timestamp, confidence, severity,
                        message, metadata, question_index
                 FROM proctoring_events
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_event(row)?);
            }

            Ok(events)
        })
        .await
    }

    /// Per-kind tallies over the persisted rows, the source of truth
    /// for finalize-time scoring.
    pub async fn get_event_counts(&self, session_id: &str) -> Result<ViolationCounts> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT kind, COUNT(*) FROM proctoring_events
                 WHERE session_id = ?1
                 GROUP BY kind",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut counts = ViolationCounts::default();
            while let Some(row) = rows.next()? {
                let kind: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                match parse_violation_kind(&kind)? {
                    ViolationKind::NoFace => counts.no_face += count as u64,
                    ViolationKind::MultipleFaces => counts.multiple_faces += count as u64,
                    ViolationKind::LookingAway => counts.looking_away += count as u64,
                    ViolationKind::TabSwitch => counts.tab_switch += count as u64,
                }
            }

            Ok(counts)
        })
        .await
    }

    /// Timestamps of one violation kind, ascending; feeds the
    /// question-correlation pass.
    pub async fn get_event_timestamps(
        &self,
        session_id: &str,
        kind: ViolationKind,
    ) -> Result<Vec<DateTime<Utc>>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp FROM proctoring_events
                 WHERE session_id = ?1 AND kind = ?2
                 ORDER BY timestamp ASC",
            )?;

            let mut rows = stmt.query(params![session_id, kind.as_str()])?;
            let mut timestamps = Vec::new();
            while let Some(row) = rows.next()? {
                let raw: String = row.get(0)?;
                timestamps.push(parse_datetime(&raw, "timestamp")?);
            }

            Ok(timestamps)
        })
        .await
    }
}

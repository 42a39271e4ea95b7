use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_phase, parse_risk_level, to_i64, to_u64},
    models::{ProctoringSession, RiskLevel, SessionPhase, SuspiciousPatterns, ViolationCounts},
};

const SESSION_COLUMNS: &str = "id, interview_id, started_at, ended_at, total_duration_seconds, \
     total_violations, no_face_count, multiple_faces_count, looking_away_count, tab_switch_count, \
     average_attention_score, integrity_score, risk_level, suspicious_patterns, phase, \
     created_at, updated_at";

fn row_to_session(row: &Row) -> Result<ProctoringSession> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let risk_level: String = row.get("risk_level")?;
    let phase: String = row.get("phase")?;
    let patterns_json: Option<String> = row.get("suspicious_patterns")?;
    let integrity_score: i64 = row.get("integrity_score")?;

    let suspicious_patterns: Option<SuspiciousPatterns> = patterns_json
        .map(|json| {
            serde_json::from_str(&json)
                .map_err(|err| anyhow!("invalid suspicious_patterns json: {err}"))
        })
        .transpose()?;

    Ok(ProctoringSession {
        id: row.get("id")?,
        interview_id: row.get("interview_id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        total_duration_seconds: to_u64(row.get("total_duration_seconds")?, "total_duration_seconds")?,
        total_violations: to_u64(row.get("total_violations")?, "total_violations")?,
        no_face_count: to_u64(row.get("no_face_count")?, "no_face_count")?,
        multiple_faces_count: to_u64(row.get("multiple_faces_count")?, "multiple_faces_count")?,
        looking_away_count: to_u64(row.get("looking_away_count")?, "looking_away_count")?,
        tab_switch_count: to_u64(row.get("tab_switch_count")?, "tab_switch_count")?,
        average_attention_score: row.get("average_attention_score")?,
        integrity_score: u8::try_from(integrity_score)
            .map_err(|_| anyhow!("integrity_score {integrity_score} out of range"))?,
        risk_level: parse_risk_level(&risk_level)?,
        suspicious_patterns,
        phase: parse_phase(&phase)?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &ProctoringSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, interview_id, started_at, ended_at,
                    total_duration_seconds, total_violations, no_face_count,
                    multiple_faces_count, looking_away_count, tab_switch_count,
                    average_attention_score, integrity_score, risk_level,
                    suspicious_patterns, phase, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    record.id,
                    record.interview_id,
                    record.started_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    to_i64(record.total_duration_seconds)?,
                    to_i64(record.total_violations)?,
                    to_i64(record.no_face_count)?,
                    to_i64(record.multiple_faces_count)?,
                    to_i64(record.looking_away_count)?,
                    to_i64(record.tab_switch_count)?,
                    record.average_attention_score,
                    i64::from(record.integrity_score),
                    record.risk_level.as_str(),
                    record
                        .suspicious_patterns
                        .as_ref()
                        .map(serde_json::to_string)
                        .transpose()?,
                    record.phase.as_str(),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<ProctoringSession> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;

            let mut rows = stmt.query(params![session_id])?;
            match rows.next()? {
                Some(row) => row_to_session(row),
                None => Err(anyhow!("session {session_id} not found")),
            }
        })
        .await
    }

    /// Bump the per-kind counters and the violation total by the counts
    /// observed in one flushed batch, as a single UPDATE.
    pub async fn bump_violation_counters(
        &self,
        session_id: &str,
        counts: ViolationCounts,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET total_violations = total_violations + ?1,
                     no_face_count = no_face_count + ?2,
                     multiple_faces_count = multiple_faces_count + ?3,
                     looking_away_count = looking_away_count + ?4,
                     tab_switch_count = tab_switch_count + ?5,
                     updated_at = ?6
                 WHERE id = ?7",
                params![
                    to_i64(counts.total())?,
                    to_i64(counts.no_face)?,
                    to_i64(counts.multiple_faces)?,
                    to_i64(counts.looking_away)?,
                    to_i64(counts.tab_switch)?,
                    updated_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Seal a session with its computed finalize fields. Counters are
    /// overwritten from the persisted event rows so the stored totals
    /// always match what is actually on disk.
    #[allow(clippy::too_many_arguments)]
    pub async fn finalize_session(
        &self,
        session_id: &str,
        ended_at: DateTime<Utc>,
        total_duration_seconds: u64,
        counts: ViolationCounts,
        average_attention_score: f64,
        integrity_score: u8,
        risk_level: RiskLevel,
        suspicious_patterns: &SuspiciousPatterns,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        let patterns_json = serde_json::to_string(suspicious_patterns)?;
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET ended_at = ?1,
                     total_duration_seconds = ?2,
                     total_violations = ?3,
                     no_face_count = ?4,
                     multiple_faces_count = ?5,
                     looking_away_count = ?6,
                     tab_switch_count = ?7,
                     average_attention_score = ?8,
                     integrity_score = ?9,
                     risk_level = ?10,
                     suspicious_patterns = ?11,
                     phase = ?12,
                     updated_at = ?13
                 WHERE id = ?14",
                params![
                    ended_at.to_rfc3339(),
                    to_i64(total_duration_seconds)?,
                    to_i64(counts.total())?,
                    to_i64(counts.no_face)?,
                    to_i64(counts.multiple_faces)?,
                    to_i64(counts.looking_away)?,
                    to_i64(counts.tab_switch)?,
                    average_attention_score,
                    i64::from(integrity_score),
                    risk_level.as_str(),
                    patterns_json,
                    SessionPhase::Finalized.as_str(),
                    ended_at.to_rfc3339(),
                    session_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("session {session_id} not found"));
            }
            Ok(())
        })
        .await
    }

    /// Sessions a previous process left running, oldest first.
    pub async fn get_active_sessions(&self) -> Result<Vec<ProctoringSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE phase = 'Active'
                 ORDER BY started_at ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }
}

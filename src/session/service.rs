use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::config::MonitorConfig;
use crate::db::{
    models::{AttentionSnapshot, ProctoringEvent, ProctoringSession, QuestionMark, SessionPhase, ViolationKind},
    Database,
};
use crate::metrics::ProctoringMetrics;
use crate::pipeline::EventBatcher;

use super::{patterns, scoring};

/// Owns session lifecycle and the per-session event batchers. Cloning
/// is cheap; all clones share the same batcher registry.
#[derive(Clone)]
pub struct SessionService {
    db: Database,
    config: MonitorConfig,
    batchers: Arc<Mutex<HashMap<String, EventBatcher>>>,
}

impl SessionService {
    pub fn new(db: Database, config: MonitorConfig) -> Self {
        Self {
            db,
            config,
            batchers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create a session against its parent interview, counters zeroed,
    /// integrity 100, risk VERY_LOW.
    pub async fn initialize(&self, interview_id: &str) -> Result<ProctoringSession> {
        let now = Utc::now();
        self.db.ensure_interview(interview_id, now).await?;

        let session = ProctoringSession::begin(interview_id, now);
        self.db.insert_session(&session).await?;

        let batcher = EventBatcher::new(&session.id, self.db.clone(), &self.config);
        self.batchers
            .lock()
            .await
            .insert(session.id.clone(), batcher);

        info!(
            "proctoring session {} opened for interview {}",
            session.id, interview_id
        );
        Ok(session)
    }

    /// The batcher registered for an active session; used to wire a
    /// local `SessionMonitor` to the same buffer the API writes into.
    pub async fn batcher(&self, session_id: &str) -> Result<EventBatcher> {
        self.batchers
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| anyhow!("no active session {session_id}"))
    }

    pub async fn store_snapshot(
        &self,
        session_id: &str,
        seconds_elapsed: u64,
        metrics: &ProctoringMetrics,
    ) -> Result<()> {
        let snapshot =
            AttentionSnapshot::from_metrics(session_id, Utc::now(), seconds_elapsed, metrics);
        self.db.insert_snapshot(&snapshot).await
    }

    /// Buffer one violation event through the session's batching
    /// pipeline.
    pub async fn store_event(&self, event: ProctoringEvent) -> Result<()> {
        let batcher = self.batcher(&event.session_id).await?;
        batcher.submit(event).await;
        Ok(())
    }

    pub async fn mark_question(&self, session_id: &str, question_index: u32) -> Result<()> {
        let mark = QuestionMark {
            id: None,
            session_id: session_id.to_string(),
            question_index,
            asked_at: Utc::now(),
        };
        self.db.insert_question_mark(&mark).await
    }

    /// Seal the session: force-flush, recompute aggregates from the
    /// persisted rows, score, classify, correlate against question
    /// timing, and escalate the parent interview when warranted.
    pub async fn finalize(&self, session_id: &str) -> Result<ProctoringSession> {
        if let Some(batcher) = self.batchers.lock().await.remove(session_id) {
            batcher.flush().await;
        }

        let session = self.db.get_session(session_id).await?;
        if session.phase == SessionPhase::Finalized {
            warn!("session {session_id} already finalized; recomputing from persisted rows");
        }

        let ended_at = Utc::now();
        let total_duration_seconds = (ended_at - session.started_at).num_seconds().max(0) as u64;

        // Counts come from the events table, not the running counters,
        // so the sealed totals always match the rows on disk.
        let counts = self.db.get_event_counts(session_id).await?;
        let average_attention = self
            .db
            .get_average_attention(session_id)
            .await?
            .unwrap_or(100.0);

        let integrity_score = scoring::integrity_score(&counts);
        let risk_level = scoring::risk_level(integrity_score);

        let marks = self.db.get_question_marks(session_id).await?;
        let looking_away = self
            .db
            .get_event_timestamps(session_id, ViolationKind::LookingAway)
            .await?;
        let suspicious_patterns = patterns::correlate_with_questions(&marks, &looking_away);

        self.db
            .finalize_session(
                session_id,
                ended_at,
                total_duration_seconds,
                counts,
                average_attention,
                integrity_score,
                risk_level,
                &suspicious_patterns,
            )
            .await?;

        if risk_level.requires_escalation() {
            match self.db.flag_interview(&session.interview_id).await {
                Ok(()) => warn!(
                    "interview {} flagged: session {} finalized at risk {}",
                    session.interview_id,
                    session_id,
                    risk_level.as_str()
                ),
                Err(err) => error!(
                    "failed to flag interview {}: {err:?}",
                    session.interview_id
                ),
            }
        }

        info!(
            "session {} finalized: integrity {}, risk {}, {} violations",
            session_id,
            integrity_score,
            risk_level.as_str(),
            counts.total()
        );

        self.db.get_session(session_id).await
    }

    /// Finalize sessions a previous process left active, from whatever
    /// rows it managed to persist. Returns how many were recovered.
    pub async fn recover_interrupted(&self) -> Result<usize> {
        let stale = self.db.get_active_sessions().await?;
        let count = stale.len();

        for session in stale {
            warn!(
                "recovering session {} left active by a previous run",
                session.id
            );
            self.finalize(&session.id).await?;
        }

        Ok(count)
    }
}

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::{FaceDetector, FrameSource};
use crate::config::MonitorConfig;
use crate::db::Database;
use crate::metrics::ProctoringMetrics;
use crate::pipeline::EventBatcher;
use crate::violations::tab_switch_candidate;

use super::loop_worker::{detection_loop, DetectionContext};
use super::{emit_candidate, MonitorShared};

/// Owns one session's detection loop: start, stop, and the external
/// signals (tab switches, question changes) that feed it.
pub struct SessionMonitor {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    batcher: Option<EventBatcher>,
    shared: Option<Arc<MonitorShared>>,
    session_id: Option<String>,
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMonitor {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            batcher: None,
            shared: None,
            session_id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the detection loop. Returns `Ok(false)` when the camera
    /// is unavailable or permission was denied — the interview then
    /// proceeds unmonitored and nothing is spawned.
    #[allow(clippy::too_many_arguments)]
    pub async fn start(
        &mut self,
        session_id: String,
        started_at: DateTime<Utc>,
        db: Database,
        config: MonitorConfig,
        mut frames: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        batcher: EventBatcher,
    ) -> Result<bool> {
        if self.handle.is_some() {
            bail!("monitoring already active");
        }

        if !frames.open().context("failed to query camera stream")? {
            warn!("camera unavailable; session {session_id} proceeds unmonitored");
            return Ok(false);
        }

        let shared = Arc::new(MonitorShared::new(config.debounce_window_secs));
        let cancel_token = CancellationToken::new();

        let ctx = DetectionContext {
            session_id: session_id.clone(),
            started_at,
            db,
            config,
            frames,
            detector,
            batcher: batcher.clone(),
            shared: Arc::clone(&shared),
        };

        let handle = tokio::spawn(detection_loop(ctx, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.batcher = Some(batcher);
        self.shared = Some(shared);
        self.session_id = Some(session_id);
        Ok(true)
    }

    /// Stop the loop: cancel the detection interval, join the task,
    /// then force a final flush of anything still buffered. The frame
    /// source is released by the loop on its way out.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("detection loop task failed to join")?;
        }

        if let Some(batcher) = self.batcher.take() {
            batcher.flush().await;
        }

        self.shared = None;
        self.session_id = None;
        Ok(())
    }

    /// Page-visibility signal from the interview surface. Flows through
    /// the same debounce/batch path as frame-derived violations.
    pub async fn report_tab_switch(&self) -> Result<()> {
        let (shared, batcher, session_id) = self.active_parts()?;
        emit_candidate(shared, batcher, session_id, tab_switch_candidate(), Utc::now()).await;
        Ok(())
    }

    /// Record which question is currently being asked; subsequent
    /// events are tagged with it.
    pub async fn set_question_index(&self, index: u32) -> Result<()> {
        let (shared, _, _) = self.active_parts()?;
        shared.set_question_index(index).await;
        Ok(())
    }

    /// Latest metrics for display; `None` before the first tick.
    pub async fn latest_metrics(&self) -> Option<ProctoringMetrics> {
        match &self.shared {
            Some(shared) => shared.latest_metrics().await,
            None => None,
        }
    }

    /// Violations emitted so far, counted at emission.
    pub fn violations_emitted(&self) -> u64 {
        self.shared
            .as_ref()
            .map(|shared| shared.violations_emitted())
            .unwrap_or(0)
    }

    fn active_parts(&self) -> Result<(&MonitorShared, &EventBatcher, &str)> {
        match (&self.shared, &self.batcher, &self.session_id) {
            (Some(shared), Some(batcher), Some(session_id)) => {
                Ok((shared, batcher, session_id))
            }
            _ => bail!("monitoring not active"),
        }
    }
}

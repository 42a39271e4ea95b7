//! Detection loop and its controller.
//!
//! One monitor per session: a cancellable tokio task samples frames on
//! a fixed tick, runs the geometry/metrics/classification pipeline, and
//! hands emitted events to the session's batcher. A second, slower tick
//! persists attention snapshots.

mod controller;
mod loop_worker;

pub use controller::SessionMonitor;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::ProctoringEvent;
use crate::metrics::ProctoringMetrics;
use crate::pipeline::EventBatcher;
use crate::violations::{Debouncer, ViolationCandidate};

/// State shared between the detection loop and the controller: the
/// latest metrics for display, the running emission counter, the
/// current question index, and the debouncer (tab switches arrive via
/// the controller but debounce against the same windows as frame
/// violations).
pub struct MonitorShared {
    latest_metrics: Mutex<Option<ProctoringMetrics>>,
    violations_emitted: AtomicU64,
    current_question: Mutex<Option<u32>>,
    debouncer: Mutex<Debouncer>,
}

impl MonitorShared {
    pub(crate) fn new(debounce_window_secs: i64) -> Self {
        Self {
            latest_metrics: Mutex::new(None),
            violations_emitted: AtomicU64::new(0),
            current_question: Mutex::new(None),
            debouncer: Mutex::new(Debouncer::new(debounce_window_secs)),
        }
    }

    pub async fn latest_metrics(&self) -> Option<ProctoringMetrics> {
        self.latest_metrics.lock().await.clone()
    }

    pub(crate) async fn set_latest_metrics(&self, metrics: ProctoringMetrics) {
        *self.latest_metrics.lock().await = Some(metrics);
    }

    pub fn violations_emitted(&self) -> u64 {
        self.violations_emitted.load(Ordering::Relaxed)
    }

    pub async fn set_question_index(&self, index: u32) {
        *self.current_question.lock().await = Some(index);
    }

    pub(crate) async fn question_index(&self) -> Option<u32> {
        *self.current_question.lock().await
    }
}

/// Run one candidate through the debouncer and, when admitted, account
/// for it and hand it to the batcher. The running total is incremented
/// here, at emission, not at persistence.
pub(crate) async fn emit_candidate(
    shared: &MonitorShared,
    batcher: &EventBatcher,
    session_id: &str,
    candidate: ViolationCandidate,
    now: DateTime<Utc>,
) {
    let admitted = shared.debouncer.lock().await.admit(candidate.kind, now);
    if !admitted {
        return;
    }

    shared.violations_emitted.fetch_add(1, Ordering::Relaxed);

    let event = ProctoringEvent::new(
        session_id,
        candidate.kind,
        now,
        candidate.confidence,
        candidate.severity,
        candidate.message,
        candidate.metadata,
        shared.question_index().await,
    );
    batcher.submit(event).await;
}

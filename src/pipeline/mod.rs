//! Event batching and persistence.
//!
//! Each session owns one `EventBatcher`. Emitted violations accumulate
//! in its buffer and are written as a single batch when the buffer
//! reaches the batch size or the flush timer fires, whichever comes
//! first. Persistence is best-effort telemetry: failures are logged and
//! swallowed, and the detection loop never waits on a write.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::warn;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::MonitorConfig;
use crate::db::{Database, ProctoringEvent, ViolationCounts};

#[derive(Clone)]
pub struct EventBatcher {
    db: Database,
    session_id: Arc<String>,
    batch_size: usize,
    flush_delay: Duration,
    inner: Arc<Mutex<BatcherInner>>,
    /// Serializes persist sections so a force-flush returns only after
    /// any in-flight fire-and-forget write has landed.
    persist_lock: Arc<Mutex<()>>,
}

struct BatcherInner {
    buffer: Vec<ProctoringEvent>,
    flush_timer: Option<JoinHandle<()>>,
}

impl EventBatcher {
    pub fn new(session_id: &str, db: Database, config: &MonitorConfig) -> Self {
        Self {
            db,
            session_id: Arc::new(session_id.to_string()),
            batch_size: config.event_batch_size,
            flush_delay: config.flush_delay,
            inner: Arc::new(Mutex::new(BatcherInner {
                buffer: Vec::new(),
                flush_timer: None,
            })),
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Buffer one emitted violation. The flush timer is armed when the
    /// buffer goes empty -> non-empty and is not re-armed by later
    /// insertions, so a flush always lands within the delay of the
    /// first buffered event.
    pub async fn submit(&self, event: ProctoringEvent) {
        let size_reached = {
            let mut inner = self.inner.lock().await;
            inner.buffer.push(event);

            if inner.buffer.len() >= self.batch_size {
                true
            } else {
                if inner.flush_timer.is_none() {
                    let batcher = self.clone();
                    inner.flush_timer = Some(tokio::spawn(async move {
                        time::sleep(batcher.flush_delay).await;
                        batcher.timer_fired().await;
                    }));
                }
                false
            }
        };

        if size_reached {
            // Fire and forget so a slow write never stalls the tick.
            let batcher = self.clone();
            tokio::spawn(async move { batcher.flush().await });
        }
    }

    async fn timer_fired(&self) {
        // Clear our own handle first so flush() does not abort the
        // task that is running it.
        self.inner.lock().await.flush_timer = None;
        self.flush().await;
    }

    /// Drain the buffer and persist it as one batch, then bump the
    /// session's counters by the batch tallies. Cancels any pending
    /// flush timer. Failures are logged, never raised.
    pub async fn flush(&self) {
        let (events, timer) = {
            let mut inner = self.inner.lock().await;
            (mem::take(&mut inner.buffer), inner.flush_timer.take())
        };

        if let Some(handle) = timer {
            handle.abort();
        }

        let _persisting = self.persist_lock.lock().await;
        if events.is_empty() {
            return;
        }

        let counts = ViolationCounts::tally(&events);
        if let Err(err) = self.db.insert_events(&events).await {
            warn!(
                "failed to persist {} proctoring events for session {}: {err:?}",
                events.len(),
                self.session_id
            );
            return;
        }

        if let Err(err) = self
            .db
            .bump_violation_counters(&self.session_id, counts, Utc::now())
            .await
        {
            warn!(
                "failed to update violation counters for session {}: {err:?}",
                self.session_id
            );
        }
    }

    #[cfg(test)]
    pub(crate) async fn buffered(&self) -> usize {
        self.inner.lock().await.buffer.len()
    }
}

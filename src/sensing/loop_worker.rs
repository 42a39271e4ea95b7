use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::capture::{FaceDetector, FrameSource};
use crate::config::MonitorConfig;
use crate::db::{AttentionSnapshot, Database};
use crate::geometry::analyze_face;
use crate::metrics::MetricsAggregator;
use crate::pipeline::EventBatcher;
use crate::violations::classify;

use super::{emit_candidate, MonitorShared};

pub(crate) struct DetectionContext {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub db: Database,
    pub config: MonitorConfig,
    pub frames: Box<dyn FrameSource>,
    pub detector: Box<dyn FaceDetector>,
    pub batcher: EventBatcher,
    pub shared: Arc<MonitorShared>,
}

pub(crate) async fn detection_loop(mut ctx: DetectionContext, cancel_token: CancellationToken) {
    let mut ticker = interval(ctx.config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The sampler skips the zero tick; a snapshot at t=0 carries no
    // information.
    let mut sampler = interval_at(
        Instant::now() + ctx.config.snapshot_interval,
        ctx.config.snapshot_interval,
    );
    sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut aggregator = MetricsAggregator::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = run_detection_tick(&mut ctx, &mut aggregator).await {
                    // A failed tick must never take the loop down;
                    // metrics are only committed after a successful
                    // computation, so no partial state is left behind.
                    error!("detection tick failed for session {}: {err:?}", ctx.session_id);
                }
            }
            _ = sampler.tick() => {
                persist_snapshot(&ctx).await;
            }
            _ = cancel_token.cancelled() => {
                info!("detection loop shutting down for session {}", ctx.session_id);
                break;
            }
        }
    }

    ctx.frames.close();
}

async fn run_detection_tick(
    ctx: &mut DetectionContext,
    aggregator: &mut MetricsAggregator,
) -> Result<()> {
    let Some(frame) = ctx.frames.next_frame()? else {
        return Ok(());
    };

    let mut faces = ctx.detector.detect(&frame)?;
    if faces.len() > ctx.config.max_faces {
        faces.truncate(ctx.config.max_faces);
    }

    // All timing below derives from the frame's capture timestamp so
    // replayed footage classifies identically to live frames.
    let now = frame.captured_at;

    let geometry = if faces.len() == 1 {
        Some(analyze_face(&faces[0], &ctx.config))
    } else {
        None
    };

    let assessment = aggregator.observe(now, &frame, &faces, geometry.as_ref());
    ctx.shared.set_latest_metrics(assessment.metrics.clone()).await;

    for candidate in classify(&assessment, &ctx.config) {
        emit_candidate(&ctx.shared, &ctx.batcher, &ctx.session_id, candidate, now).await;
    }

    Ok(())
}

/// Persist the latest metrics as an attention snapshot, fire-and-forget.
async fn persist_snapshot(ctx: &DetectionContext) {
    let Some(metrics) = ctx.shared.latest_metrics().await else {
        return;
    };

    let now = Utc::now();
    let seconds_elapsed = (now - ctx.started_at).num_seconds().max(0) as u64;
    let snapshot = AttentionSnapshot::from_metrics(&ctx.session_id, now, seconds_elapsed, &metrics);

    let db = ctx.db.clone();
    tokio::spawn(async move {
        if let Err(err) = db.insert_snapshot(&snapshot).await {
            warn!(
                "failed to persist attention snapshot for session {}: {err:?}",
                snapshot.session_id
            );
        }
    });
}

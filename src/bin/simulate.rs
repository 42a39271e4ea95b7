//! Scenario replay: drives the monitoring engine against scripted
//! footage and prints the finalized session.
//!
//! The script walks through the interesting phases of an interview —
//! attentive candidate, off-screen glances, a blink burst, an empty
//! chair, a second person in frame — while the host reports question
//! changes and tab switches. Run with RUST_LOG=info to watch the
//! pipeline work.

use std::time::Duration;

use anyhow::Result;
use chrono::Duration as FrameSpacing;
use chrono::Utc;
use log::info;
use rand::Rng;
use uuid::Uuid;

use vigil::capture::scripted::{
    blinking_face, centered_face, face_with_iris_offset, ScriptedDetector, ScriptedFrames,
};
use vigil::{Database, MonitorConfig, SessionMonitor, SessionService};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("vigil scenario replay starting up...");

    let db_path = std::env::temp_dir().join(format!("vigil-simulate-{}.sqlite3", Uuid::new_v4()));
    let database = Database::new(db_path)?;

    let mut config = MonitorConfig::from_env();
    config.snapshot_interval = Duration::from_secs(3);

    let service = SessionService::new(database.clone(), config.clone());
    let recovered = service.recover_interrupted().await?;
    if recovered > 0 {
        info!("recovered {recovered} interrupted sessions");
    }

    let session = service.initialize("interview-demo").await?;

    // 12 seconds of footage at the detection cadence. Gaze jitter stays
    // well inside the center zone so only the scripted phases violate.
    let mut rng = rand::thread_rng();
    let mut script = Vec::new();
    for i in 0..60 {
        let seconds = i as f64 * 0.2;
        let jitter_x = rng.gen_range(-0.04..0.04);
        let jitter_y = rng.gen_range(-0.04..0.04);
        script.push(match seconds {
            s if s < 3.0 => vec![face_with_iris_offset(jitter_x, jitter_y)],
            s if s < 5.4 => vec![face_with_iris_offset(0.3, jitter_y)],
            s if s < 6.0 => vec![blinking_face(0.3, 0.0)],
            s if s < 9.0 => Vec::new(),
            s if s < 10.0 => vec![centered_face(), centered_face()],
            _ => vec![face_with_iris_offset(jitter_x, jitter_y)],
        });
    }

    let frames = ScriptedFrames::new(Utc::now(), FrameSpacing::milliseconds(200), script.len());
    let detector = ScriptedDetector::new(script);

    let mut monitor = SessionMonitor::new();
    let batcher = service.batcher(&session.id).await?;
    let started = monitor
        .start(
            session.id.clone(),
            session.started_at,
            database.clone(),
            config,
            Box::new(frames),
            Box::new(detector),
            batcher,
        )
        .await?;
    if !started {
        info!("camera unavailable, interview proceeds unmonitored");
        return Ok(());
    }

    monitor.set_question_index(0).await?;
    service.mark_question(&session.id, 0).await?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    monitor.report_tab_switch().await?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    monitor.set_question_index(1).await?;
    service.mark_question(&session.id, 1).await?;

    tokio::time::sleep(Duration::from_secs(3)).await;
    monitor.report_tab_switch().await?;

    tokio::time::sleep(Duration::from_millis(2500)).await;
    monitor.set_question_index(2).await?;
    service.mark_question(&session.id, 2).await?;

    if let Some(metrics) = monitor.latest_metrics().await {
        info!(
            "live metrics: attention {:.0}, gaze {}",
            metrics.attention_score,
            metrics.gaze_direction.as_str()
        );
    }

    tokio::time::sleep(Duration::from_millis(1500)).await;
    monitor.report_tab_switch().await?;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let emitted = monitor.violations_emitted();
    monitor.stop().await?;
    info!("replay done, {emitted} violations emitted");

    let finalized = service.finalize(&session.id).await?;
    println!("{}", serde_json::to_string_pretty(&finalized)?);

    Ok(())
}

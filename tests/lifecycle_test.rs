//! End-to-end lifecycle tests: scripted footage through the detection
//! loop, the control API, finalize-time scoring, pattern detection,
//! and crash recovery.

use std::time::Duration;

use chrono::{Duration as FrameSpacing, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use vigil::api::{handle_request, ProctoringRequest, ProctoringResponse};
use vigil::capture::scripted::{
    blinking_face, centered_face, face_with_iris_offset, ScriptedDetector, ScriptedFrames,
};
use vigil::db::models::{
    ProctoringSession, QuestionMark, RiskLevel, SessionPhase, Severity, ViolationKind,
};
use vigil::geometry::{GazeDirection, HeadPose};
use vigil::metrics::ProctoringMetrics;
use vigil::{Database, MonitorConfig, SessionMonitor, SessionService};

fn open_database(dir: &TempDir) -> Database {
    Database::new(dir.path().join("vigil-test.sqlite3")).unwrap()
}

/// Fast replay config: the loop ticks quickly, while classification
/// timing still comes from the 200 ms frame timestamps.
fn replay_config() -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.tick_interval = Duration::from_millis(2);
    config
}

fn metrics_with_attention(attention_score: f64) -> ProctoringMetrics {
    ProctoringMetrics {
        face_detected: true,
        face_count: 1,
        attention_score,
        gaze_direction: GazeDirection::Center,
        head_pose: HeadPose::default(),
        iris_deviation: 0.0,
        face_distance: None,
        lighting_quality: Some(0.5),
    }
}

async fn run_script(
    service: &SessionService,
    database: &Database,
    session: &ProctoringSession,
    script: Vec<Vec<vigil::capture::FaceObservation>>,
    expected_emissions: u64,
) {
    let frames = ScriptedFrames::new(Utc::now(), FrameSpacing::milliseconds(200), script.len());
    let detector = ScriptedDetector::new(script);

    let mut monitor = SessionMonitor::new();
    let batcher = service.batcher(&session.id).await.unwrap();
    let started = monitor
        .start(
            session.id.clone(),
            session.started_at,
            database.clone(),
            replay_config(),
            Box::new(frames),
            Box::new(detector),
            batcher,
        )
        .await
        .unwrap();
    assert!(started);

    // Give the loop time to chew through the script, then check the
    // emission counter settled where expected.
    for _ in 0..200 {
        if monitor.violations_emitted() >= expected_emissions {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(monitor.violations_emitted(), expected_emissions);

    monitor.stop().await.unwrap();
}

#[tokio::test]
async fn no_face_burst_emits_a_single_event() {
    let dir = TempDir::new().unwrap();
    let database = open_database(&dir);
    let service = SessionService::new(database.clone(), replay_config());
    let session = service.initialize("interview-1").await.unwrap();

    // One attentive frame, then an empty chair for 3.2 seconds of
    // footage: the 2-second threshold is crossed once.
    let mut script = vec![vec![centered_face()]];
    for _ in 0..16 {
        script.push(Vec::new());
    }

    run_script(&service, &database, &session, script, 1).await;

    let finalized = service.finalize(&session.id).await.unwrap();
    let events = database.get_events_for_session(&session.id).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ViolationKind::NoFace);
    assert_eq!(events[0].severity, Severity::High);
    assert_eq!(finalized.total_violations, 1);
    assert_eq!(finalized.no_face_count, 1);
    assert_eq!(finalized.phase, SessionPhase::Finalized);
}

#[tokio::test]
async fn off_screen_gaze_emits_and_blinks_do_not() {
    let dir = TempDir::new().unwrap();
    let database = open_database(&dir);
    let service = SessionService::new(database.clone(), replay_config());

    // Sustained off-screen gaze: one looking_away event per debounce
    // window.
    let session = service.initialize("interview-gaze").await.unwrap();
    let script = (0..5).map(|_| vec![face_with_iris_offset(0.25, 0.0)]).collect();
    run_script(&service, &database, &session, script, 1).await;

    let finalized = service.finalize(&session.id).await.unwrap();
    assert_eq!(finalized.looking_away_count, 1);

    // Same offsets mid-blink: nothing is emitted.
    let session = service.initialize("interview-blink").await.unwrap();
    let script = (0..5).map(|_| vec![blinking_face(0.25, 0.0)]).collect();
    run_script(&service, &database, &session, script, 0).await;

    let finalized = service.finalize(&session.id).await.unwrap();
    assert_eq!(finalized.total_violations, 0);
    assert_eq!(finalized.integrity_score, 100);
}

#[tokio::test]
async fn emitted_totals_match_persisted_rows() {
    let dir = TempDir::new().unwrap();
    let database = open_database(&dir);
    let service = SessionService::new(database.clone(), replay_config());
    let session = service.initialize("interview-2").await.unwrap();

    // Gaze violation, a no-face stretch, then a second face: three
    // distinct kinds, one emission each.
    let mut script = Vec::new();
    for _ in 0..3 {
        script.push(vec![face_with_iris_offset(0.3, 0.0)]);
    }
    for _ in 0..13 {
        script.push(Vec::new());
    }
    for _ in 0..3 {
        script.push(vec![centered_face(), centered_face()]);
    }

    run_script(&service, &database, &session, script, 3).await;

    let finalized = service.finalize(&session.id).await.unwrap();
    let events = database.get_events_for_session(&session.id).await.unwrap();

    assert_eq!(finalized.total_violations as usize, events.len());
    assert_eq!(finalized.looking_away_count, 1);
    assert_eq!(finalized.no_face_count, 1);
    assert_eq!(finalized.multiple_faces_count, 1);
}

#[tokio::test]
async fn camera_denial_leaves_interview_unmonitored() {
    let dir = TempDir::new().unwrap();
    let database = open_database(&dir);
    let service = SessionService::new(database.clone(), replay_config());
    let session = service.initialize("interview-3").await.unwrap();

    let mut monitor = SessionMonitor::new();
    let batcher = service.batcher(&session.id).await.unwrap();
    let started = monitor
        .start(
            session.id.clone(),
            session.started_at,
            database.clone(),
            replay_config(),
            Box::new(ScriptedFrames::unavailable()),
            Box::new(ScriptedDetector::new(Vec::new())),
            batcher,
        )
        .await
        .unwrap();

    assert!(!started);
    assert!(!monitor.is_active());

    // The interview still finalizes cleanly with neutral values.
    let finalized = service.finalize(&session.id).await.unwrap();
    assert_eq!(finalized.integrity_score, 100);
    assert_eq!(finalized.average_attention_score, 100.0);
    assert_eq!(finalized.risk_level, RiskLevel::VeryLow);
}

#[tokio::test]
async fn api_lifecycle_detects_question_correlation() {
    let dir = TempDir::new().unwrap();
    let database = open_database(&dir);
    let service = SessionService::new(database.clone(), MonitorConfig::default());

    let response = handle_request(
        &service,
        ProctoringRequest::Initialize {
            interview_id: "interview-api".to_string(),
        },
    )
    .await
    .unwrap();
    let session = match response {
        ProctoringResponse::Session(session) => session,
        other => panic!("unexpected response: {other:?}"),
    };

    // Ten questions a minute apart; a looking-away glance five seconds
    // before four of them.
    let t0 = Utc::now();
    for index in 0..10u32 {
        let asked_at = t0 + FrameSpacing::seconds(i64::from(index) * 60);
        database
            .insert_question_mark(&QuestionMark {
                id: None,
                session_id: session.id.clone(),
                question_index: index,
                asked_at,
            })
            .await
            .unwrap();
    }
    for index in [0u32, 2, 5, 8] {
        let timestamp = t0 + FrameSpacing::seconds(i64::from(index) * 60 - 5);
        let request: ProctoringRequest = serde_json::from_value(json!({
            "action": "storeEvent",
            "sessionId": session.id,
            "event": {
                "kind": "looking_away",
                "timestamp": timestamp.to_rfc3339(),
                "confidence": 0.75,
                "severity": "MEDIUM",
                "message": "Candidate looking left",
                "metadata": { "gazeDirection": "left" }
            },
            "questionIndex": index
        }))
        .unwrap();
        handle_request(&service, request).await.unwrap();
    }

    let response = handle_request(
        &service,
        ProctoringRequest::Finalize {
            session_id: session.id.clone(),
        },
    )
    .await
    .unwrap();
    let finalized = match response {
        ProctoringResponse::Session(session) => session,
        other => panic!("unexpected response: {other:?}"),
    };

    let patterns = finalized.suspicious_patterns.unwrap();
    assert!(patterns.is_suspicious);
    assert!((patterns.confidence - 0.4).abs() < 1e-9);
    assert_eq!(
        patterns.details,
        "looking-away events preceded 4 of 10 questions"
    );

    // Four looking-away events: one past the threshold of three.
    assert_eq!(finalized.total_violations, 4);
    assert_eq!(finalized.integrity_score, 94);
    assert_eq!(finalized.risk_level, RiskLevel::VeryLow);
}

#[tokio::test]
async fn high_risk_session_flags_parent_interview() {
    let dir = TempDir::new().unwrap();
    let database = open_database(&dir);
    let service = SessionService::new(database.clone(), MonitorConfig::default());
    let session = service.initialize("interview-flagged").await.unwrap();

    let now = Utc::now();
    for (kind, count) in [("multiple_faces", 5i64), ("tab_switch", 5)] {
        for i in 0..count {
            let request: ProctoringRequest = serde_json::from_value(json!({
                "action": "storeEvent",
                "sessionId": session.id,
                "event": {
                    "kind": kind,
                    "timestamp": (now + FrameSpacing::seconds(i * 10)).to_rfc3339(),
                    "confidence": 1.0,
                    "severity": "HIGH",
                    "message": "scripted violation"
                }
            }))
            .unwrap();
            handle_request(&service, request).await.unwrap();
        }
    }

    let finalized = service.finalize(&session.id).await.unwrap();

    // Excess of 4x100 + 3x70 over a 930 ceiling: integrity 34.
    assert_eq!(finalized.integrity_score, 34);
    assert_eq!(finalized.risk_level, RiskLevel::Critical);

    let interview = database
        .get_interview("interview-flagged")
        .await
        .unwrap()
        .unwrap();
    assert!(interview.integrity_flagged);
}

#[tokio::test]
async fn snapshot_average_feeds_finalize() {
    let dir = TempDir::new().unwrap();
    let database = open_database(&dir);
    let service = SessionService::new(database.clone(), MonitorConfig::default());
    let session = service.initialize("interview-snapshots").await.unwrap();

    for (seconds_elapsed, attention) in [(10u64, 80.0), (20, 60.0)] {
        handle_request(
            &service,
            ProctoringRequest::StoreSnapshot {
                session_id: session.id.clone(),
                seconds_elapsed,
                metrics: metrics_with_attention(attention),
            },
        )
        .await
        .unwrap();
    }

    let finalized = service.finalize(&session.id).await.unwrap();
    assert_eq!(finalized.average_attention_score, 70.0);

    let snapshots = database
        .get_snapshots_for_session(&session.id)
        .await
        .unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].seconds_elapsed, 10);
}

#[tokio::test]
async fn recovery_finalizes_stale_sessions() {
    let dir = TempDir::new().unwrap();
    let database = open_database(&dir);
    let service = SessionService::new(database.clone(), MonitorConfig::default());

    let session = service.initialize("interview-stale").await.unwrap();

    // A new process comes up and sweeps whatever was left active.
    let recovered = service.recover_interrupted().await.unwrap();
    assert_eq!(recovered, 1);

    let finalized = database.get_session(&session.id).await.unwrap();
    assert_eq!(finalized.phase, SessionPhase::Finalized);
    assert_eq!(finalized.integrity_score, 100);
    assert_eq!(finalized.average_attention_score, 100.0);
    assert_eq!(
        finalized.suspicious_patterns.unwrap().details,
        "no questions recorded"
    );
}

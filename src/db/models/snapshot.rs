//! Attention snapshot data model.
//!
//! A low-rate telemetry row written roughly every 10 seconds of active
//! monitoring, independent of the violation stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::GazeDirection;
use crate::metrics::ProctoringMetrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionSnapshot {
    pub id: Option<i64>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub seconds_elapsed: u64,
    pub face_detected: bool,
    pub face_count: u32,
    pub attention_score: f64,
    pub gaze_direction: GazeDirection,
    pub head_yaw: f64,
    pub head_pitch: f64,
    pub iris_deviation: f64,
}

impl AttentionSnapshot {
    pub fn from_metrics(
        session_id: &str,
        timestamp: DateTime<Utc>,
        seconds_elapsed: u64,
        metrics: &ProctoringMetrics,
    ) -> Self {
        Self {
            id: None,
            session_id: session_id.to_string(),
            timestamp,
            seconds_elapsed,
            face_detected: metrics.face_detected,
            face_count: metrics.face_count,
            attention_score: metrics.attention_score,
            gaze_direction: metrics.gaze_direction,
            head_yaw: metrics.head_pose.yaw,
            head_pitch: metrics.head_pose.pitch,
            iris_deviation: metrics.iris_deviation,
        }
    }
}

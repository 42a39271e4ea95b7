use serde::{Deserialize, Serialize};

use crate::geometry::{GazeDirection, HeadPose};

/// Live per-tick metrics. Recomputed on every detection tick; only the
/// latest value is held in memory for display, and the snapshot
/// sampler persists it on its own cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctoringMetrics {
    pub face_detected: bool,
    pub face_count: u32,
    pub attention_score: f64,
    pub gaze_direction: GazeDirection,
    pub head_pose: HeadPose,
    pub iris_deviation: f64,
    /// Unitless distance proxy: inverse of the normalized inter-ocular
    /// span, larger meaning farther from the camera.
    pub face_distance: Option<f64>,
    /// Mean frame luminance in [0, 1] when the capture layer reports it.
    pub lighting_quality: Option<f64>,
}

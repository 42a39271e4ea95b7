//! Per-face geometry analysis.
//!
//! Pure functions from one `FaceObservation` to gaze direction, head
//! pose, and blink state. No timing or session state lives here; the
//! aggregator layers that on top.

pub mod gaze;
pub mod head_pose;

pub use gaze::{iris_gaze, GazeDirection, GazeReading};
pub use head_pose::HeadPose;

use crate::capture::FaceObservation;
use crate::config::MonitorConfig;

/// Blend-shape categories for eye closure, as named by the landmark model.
pub const BLEND_EYE_BLINK_LEFT: &str = "eyeBlinkLeft";
pub const BLEND_EYE_BLINK_RIGHT: &str = "eyeBlinkRight";

#[derive(Debug, Clone)]
pub struct FaceGeometry {
    /// Iris-based gaze; absent when the observation carries no refined
    /// iris landmarks.
    pub iris: Option<GazeReading>,
    pub head_pose: HeadPose,
    pub head_gaze: GazeDirection,
    pub is_blinking: bool,
}

impl FaceGeometry {
    /// Gaze direction to report: iris signal when present, head pose
    /// otherwise.
    pub fn direction(&self) -> GazeDirection {
        self.iris
            .as_ref()
            .map(|reading| reading.direction)
            .unwrap_or(self.head_gaze)
    }
}

/// Analyze a single observed face. Multi-face frames never reach this
/// point; the classifier short-circuits them to the multiple-faces path.
pub fn analyze_face(observation: &FaceObservation, config: &MonitorConfig) -> FaceGeometry {
    let head_pose = head_pose::from_transform(&observation.transform);
    let head_gaze = head_pose::head_gaze(&head_pose, config);
    let iris = iris_gaze(&observation.landmarks, config);

    let left_blink = observation
        .blend_shape_score(BLEND_EYE_BLINK_LEFT)
        .unwrap_or(0.0);
    let right_blink = observation
        .blend_shape_score(BLEND_EYE_BLINK_RIGHT)
        .unwrap_or(0.0);
    let is_blinking =
        left_blink > config.blink_threshold || right_blink > config.blink_threshold;

    FaceGeometry {
        iris,
        head_pose,
        head_gaze,
        is_blinking,
    }
}

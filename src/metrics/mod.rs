//! Per-tick metrics aggregation.
//!
//! Combines the face count with the geometry analysis into one
//! `ProctoringMetrics` value plus the looking-away decision the
//! classifier consumes. All timing is derived from the frame's capture
//! timestamp, never read from a clock here.

mod types;

pub use types::ProctoringMetrics;

use chrono::{DateTime, Utc};

use crate::capture::{CameraFrame, FaceObservation, Landmark};
use crate::geometry::{
    gaze::{LEFT_EYE_OUTER, RIGHT_EYE_OUTER},
    FaceGeometry, GazeDirection, HeadPose,
};

/// Attention lost per second without a face.
const NO_FACE_DECAY_PER_SEC: f64 = 5.0;
/// Attention while the candidate is looking away from the screen.
const LOOKING_AWAY_ATTENTION: f64 = 70.0;

/// A positive looking-away decision for the current frame, with the
/// confidence the resulting violation will carry.
#[derive(Debug, Clone, Copy)]
pub struct LookingAwayDecision {
    pub confidence: f64,
    pub direction: GazeDirection,
    pub deviation: f64,
}

/// Everything the classifier needs about one frame.
#[derive(Debug, Clone)]
pub struct FrameAssessment {
    pub metrics: ProctoringMetrics,
    pub looking_away: Option<LookingAwayDecision>,
    pub seconds_since_last_face: f64,
}

#[derive(Default)]
pub struct MetricsAggregator {
    last_face_seen: Option<DateTime<Utc>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame into the aggregate state. `geometry` is present
    /// exactly when one face was observed; multi-face frames skip gaze
    /// analysis entirely.
    pub fn observe(
        &mut self,
        now: DateTime<Utc>,
        frame: &CameraFrame,
        faces: &[FaceObservation],
        geometry: Option<&FaceGeometry>,
    ) -> FrameAssessment {
        let face_count = faces.len() as u32;
        if face_count > 0 {
            self.last_face_seen = Some(now);
        }

        // A session that opens on an empty chair anchors the decay at
        // its first frame.
        let reference = *self.last_face_seen.get_or_insert(now);
        let seconds_since_last_face =
            (now - reference).num_milliseconds().max(0) as f64 / 1000.0;

        let lighting_quality = frame.mean_luminance;

        if face_count == 0 {
            let attention_score =
                (100.0 - NO_FACE_DECAY_PER_SEC * seconds_since_last_face).max(0.0);
            return FrameAssessment {
                metrics: ProctoringMetrics {
                    face_detected: false,
                    face_count: 0,
                    attention_score,
                    gaze_direction: GazeDirection::Away,
                    head_pose: HeadPose::default(),
                    iris_deviation: 0.0,
                    face_distance: None,
                    lighting_quality,
                },
                looking_away: None,
                seconds_since_last_face,
            };
        }

        if face_count > 1 {
            // Face-count violation takes priority; gaze never runs.
            return FrameAssessment {
                metrics: ProctoringMetrics {
                    face_detected: true,
                    face_count,
                    attention_score: 100.0,
                    gaze_direction: GazeDirection::Center,
                    head_pose: HeadPose::default(),
                    iris_deviation: 0.0,
                    face_distance: face_distance(&faces[0].landmarks),
                    lighting_quality,
                },
                looking_away: None,
                seconds_since_last_face,
            };
        }

        let geometry = match geometry {
            Some(geometry) => geometry,
            // Detector produced a face the analyzer could not process;
            // report presence and nothing else.
            None => {
                return FrameAssessment {
                    metrics: ProctoringMetrics {
                        face_detected: true,
                        face_count: 1,
                        attention_score: 100.0,
                        gaze_direction: GazeDirection::Center,
                        head_pose: HeadPose::default(),
                        iris_deviation: 0.0,
                        face_distance: face_distance(&faces[0].landmarks),
                        lighting_quality,
                    },
                    looking_away: None,
                    seconds_since_last_face,
                };
            }
        };

        let iris_away = geometry
            .iris
            .map(|reading| reading.is_looking_away)
            .unwrap_or(false);
        let iris_non_center = geometry
            .iris
            .map(|reading| reading.direction != GazeDirection::Center)
            .unwrap_or(false);
        let head_non_center = geometry.head_gaze != GazeDirection::Center;

        let looking_away = if (iris_away || head_non_center) && !geometry.is_blinking {
            let confidence = if iris_non_center && head_non_center {
                0.95
            } else {
                0.75
            };
            Some(LookingAwayDecision {
                confidence,
                direction: geometry.direction(),
                deviation: geometry.iris.map(|r| r.deviation).unwrap_or(0.0),
            })
        } else {
            None
        };

        let attention_score = if looking_away.is_some() {
            LOOKING_AWAY_ATTENTION
        } else {
            100.0
        };

        FrameAssessment {
            metrics: ProctoringMetrics {
                face_detected: true,
                face_count: 1,
                attention_score,
                gaze_direction: geometry.direction(),
                head_pose: geometry.head_pose,
                iris_deviation: geometry.iris.map(|r| r.deviation).unwrap_or(0.0),
                face_distance: face_distance(&faces[0].landmarks),
                lighting_quality,
            },
            looking_away,
            seconds_since_last_face,
        }
    }
}

fn face_distance(landmarks: &[Landmark]) -> Option<f64> {
    let left = landmarks.get(LEFT_EYE_OUTER)?;
    let right = landmarks.get(RIGHT_EYE_OUTER)?;
    let span = (right.x - left.x).abs();
    if span < f64::EPSILON {
        return None;
    }
    Some(1.0 / span)
}

//! Capability boundary for the camera stream and the face landmark model.
//!
//! The engine never touches pixels or a detection backend directly: it
//! pulls `CameraFrame`s from a `FrameSource` and hands them to a
//! `FaceDetector`, which yields zero or more `FaceObservation`s per
//! frame. Both seams are object-safe so tests and the replay binary can
//! substitute deterministic fixtures.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 2-D (or weakly 3-D) point on a detected face, in normalized
/// image coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// A named expression/pose category score in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub score: f64,
}

/// One detected face: fixed-shape landmark array, named blend-shape
/// scores, and a column-major 4x4 head transformation matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceObservation {
    pub landmarks: Vec<Landmark>,
    pub blend_shapes: Vec<BlendShape>,
    pub transform: [f64; 16],
}

impl FaceObservation {
    pub fn blend_shape_score(&self, name: &str) -> Option<f64> {
        self.blend_shapes
            .iter()
            .find(|shape| shape.name == name)
            .map(|shape| shape.score)
    }
}

/// A frame handle. Pixel data stays inside the capture layer; the
/// engine only needs the capture timestamp and coarse frame metadata.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub captured_at: DateTime<Utc>,
    /// Mean luminance in [0, 1], when the capture layer computes it.
    pub mean_luminance: Option<f64>,
}

/// Camera stream seam. `open` returns false when the camera is
/// unavailable or permission was denied; the interview then proceeds
/// unmonitored.
pub trait FrameSource: Send + Sync {
    fn open(&mut self) -> Result<bool>;
    fn next_frame(&mut self) -> Result<Option<CameraFrame>>;
    fn close(&mut self) {}
}

/// Landmark model seam: one call per frame, zero or more faces out.
pub trait FaceDetector: Send + Sync {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<FaceObservation>>;
}

/// Scripted fixtures used by the replay binary and the test suite. A
/// script is a list of per-frame detection results; the source stamps
/// frames at a fixed spacing from a synthetic start time so downstream
/// timing logic is deterministic.
pub mod scripted {
    use std::collections::VecDeque;

    use anyhow::Result;
    use chrono::{DateTime, Duration, Utc};

    use crate::geometry::{
        gaze::{
            LEFT_EYE_BOTTOM, LEFT_EYE_INNER, LEFT_EYE_OUTER, LEFT_EYE_TOP, LEFT_IRIS_CENTER,
            RIGHT_EYE_BOTTOM, RIGHT_EYE_INNER, RIGHT_EYE_OUTER, RIGHT_EYE_TOP, RIGHT_IRIS_CENTER,
        },
        BLEND_EYE_BLINK_LEFT, BLEND_EYE_BLINK_RIGHT,
    };

    use super::{BlendShape, CameraFrame, FaceDetector, FaceObservation, FrameSource, Landmark};

    pub struct ScriptedFrames {
        next_at: DateTime<Utc>,
        spacing: Duration,
        remaining: usize,
        available: bool,
    }

    impl ScriptedFrames {
        pub fn new(start: DateTime<Utc>, spacing: Duration, frames: usize) -> Self {
            Self {
                next_at: start,
                spacing,
                remaining: frames,
                available: true,
            }
        }

        /// A source whose `open` reports the camera as unavailable.
        pub fn unavailable() -> Self {
            Self {
                next_at: Utc::now(),
                spacing: Duration::milliseconds(200),
                remaining: 0,
                available: false,
            }
        }
    }

    impl FrameSource for ScriptedFrames {
        fn open(&mut self) -> Result<bool> {
            Ok(self.available)
        }

        fn next_frame(&mut self) -> Result<Option<CameraFrame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            let frame = CameraFrame {
                captured_at: self.next_at,
                mean_luminance: Some(0.6),
            };
            self.next_at += self.spacing;
            Ok(Some(frame))
        }
    }

    pub struct ScriptedDetector {
        script: VecDeque<Vec<FaceObservation>>,
        /// Result replayed once the script runs out.
        fallback: Vec<FaceObservation>,
    }

    impl ScriptedDetector {
        pub fn new(script: Vec<Vec<FaceObservation>>) -> Self {
            Self {
                script: script.into(),
                fallback: Vec::new(),
            }
        }

        pub fn with_fallback(mut self, fallback: Vec<FaceObservation>) -> Self {
            self.fallback = fallback;
            self
        }
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &CameraFrame) -> Result<Vec<FaceObservation>> {
            Ok(self.script.pop_front().unwrap_or_else(|| self.fallback.clone()))
        }
    }

    const IDENTITY: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    /// A face looking straight at the camera, with both irises shifted
    /// by the given fractions of eye width/height.
    pub fn face_with_iris_offset(offset_x: f64, offset_y: f64) -> FaceObservation {
        let mut landmarks = vec![Landmark::new(0.5, 0.5); 478];

        landmarks[LEFT_EYE_OUTER] = Landmark::new(0.30, 0.40);
        landmarks[LEFT_EYE_INNER] = Landmark::new(0.42, 0.40);
        landmarks[LEFT_EYE_TOP] = Landmark::new(0.36, 0.37);
        landmarks[LEFT_EYE_BOTTOM] = Landmark::new(0.36, 0.43);

        landmarks[RIGHT_EYE_INNER] = Landmark::new(0.58, 0.40);
        landmarks[RIGHT_EYE_OUTER] = Landmark::new(0.70, 0.40);
        landmarks[RIGHT_EYE_TOP] = Landmark::new(0.64, 0.37);
        landmarks[RIGHT_EYE_BOTTOM] = Landmark::new(0.64, 0.43);

        // Both fixture eyes are 0.12 wide and 0.06 tall.
        let dx = offset_x * 0.12;
        let dy = offset_y * 0.06;
        landmarks[LEFT_IRIS_CENTER] = Landmark::new(0.36 + dx, 0.40 + dy);
        landmarks[RIGHT_IRIS_CENTER] = Landmark::new(0.64 + dx, 0.40 + dy);

        FaceObservation {
            landmarks,
            blend_shapes: vec![
                BlendShape {
                    name: BLEND_EYE_BLINK_LEFT.to_string(),
                    score: 0.05,
                },
                BlendShape {
                    name: BLEND_EYE_BLINK_RIGHT.to_string(),
                    score: 0.05,
                },
            ],
            transform: IDENTITY,
        }
    }

    pub fn centered_face() -> FaceObservation {
        face_with_iris_offset(0.0, 0.0)
    }

    /// Same gaze offsets, but mid-blink; looking-away classification
    /// must be suppressed for these frames.
    pub fn blinking_face(offset_x: f64, offset_y: f64) -> FaceObservation {
        let mut observation = face_with_iris_offset(offset_x, offset_y);
        for shape in &mut observation.blend_shapes {
            shape.score = 0.9;
        }
        observation
    }
}

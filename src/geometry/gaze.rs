//! Iris-based gaze estimation.
//!
//! Offsets are measured per eye as (iris center − eye center) scaled by
//! the eye's extent, then averaged across both eyes. Landmark indices
//! follow the MediaPipe FaceMesh layout with refined iris points.

use serde::{Deserialize, Serialize};

use crate::capture::Landmark;
use crate::config::MonitorConfig;

pub const LEFT_EYE_OUTER: usize = 33;
pub const LEFT_EYE_INNER: usize = 133;
pub const LEFT_EYE_TOP: usize = 159;
pub const LEFT_EYE_BOTTOM: usize = 145;
pub const LEFT_IRIS_CENTER: usize = 468;

pub const RIGHT_EYE_INNER: usize = 362;
pub const RIGHT_EYE_OUTER: usize = 263;
pub const RIGHT_EYE_TOP: usize = 386;
pub const RIGHT_EYE_BOTTOM: usize = 374;
pub const RIGHT_IRIS_CENTER: usize = 473;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeDirection {
    Center,
    Left,
    Right,
    Up,
    Down,
    Away,
}

impl GazeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            GazeDirection::Center => "center",
            GazeDirection::Left => "left",
            GazeDirection::Right => "right",
            GazeDirection::Up => "up",
            GazeDirection::Down => "down",
            GazeDirection::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GazeReading {
    pub direction: GazeDirection,
    /// Euclidean norm of the averaged (x, y) iris offsets.
    pub deviation: f64,
    pub is_looking_away: bool,
}

fn eye_offsets(
    landmarks: &[Landmark],
    corner_a: usize,
    corner_b: usize,
    top: usize,
    bottom: usize,
    iris: usize,
) -> Option<(f64, f64)> {
    let corner_a = landmarks.get(corner_a)?;
    let corner_b = landmarks.get(corner_b)?;
    let top = landmarks.get(top)?;
    let bottom = landmarks.get(bottom)?;
    let iris = landmarks.get(iris)?;

    let eye_width = (corner_b.x - corner_a.x).abs();
    let eye_height = (bottom.y - top.y).abs();
    if eye_width < f64::EPSILON || eye_height < f64::EPSILON {
        return None;
    }

    let center_x = (corner_a.x + corner_b.x) / 2.0;
    let center_y = (top.y + bottom.y) / 2.0;

    Some((
        (iris.x - center_x) / eye_width,
        (iris.y - center_y) / eye_height,
    ))
}

/// Returns `None` when the observation has no usable iris landmarks
/// (unrefined model output); callers fall back to head pose.
pub fn iris_gaze(landmarks: &[Landmark], config: &MonitorConfig) -> Option<GazeReading> {
    let left = eye_offsets(
        landmarks,
        LEFT_EYE_OUTER,
        LEFT_EYE_INNER,
        LEFT_EYE_TOP,
        LEFT_EYE_BOTTOM,
        LEFT_IRIS_CENTER,
    )?;
    let right = eye_offsets(
        landmarks,
        RIGHT_EYE_INNER,
        RIGHT_EYE_OUTER,
        RIGHT_EYE_TOP,
        RIGHT_EYE_BOTTOM,
        RIGHT_IRIS_CENTER,
    )?;

    let offset_x = (left.0 + right.0) / 2.0;
    let offset_y = (left.1 + right.1) / 2.0;
    let deviation = offset_x.hypot(offset_y);

    let direction = if offset_x.abs() < config.iris_horizontal_threshold
        && offset_y.abs() < config.iris_vertical_threshold
    {
        GazeDirection::Center
    } else if offset_x.abs() >= offset_y.abs() {
        // Source frames are mirrored, so a positive image-space offset
        // is the user looking to their left.
        if offset_x > 0.0 {
            GazeDirection::Left
        } else {
            GazeDirection::Right
        }
    } else if offset_y > 0.0 {
        GazeDirection::Down
    } else {
        GazeDirection::Up
    };

    let is_looking_away = deviation > config.iris_horizontal_threshold
        || offset_y.abs() > config.iris_vertical_threshold;

    Some(GazeReading {
        direction,
        deviation,
        is_looking_away,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::scripted::face_with_iris_offset;

    /// Fixture landmarks with both irises shifted by a fraction of eye
    /// width/height.
    fn landmarks_with_offset(offset_x: f64, offset_y: f64) -> Vec<Landmark> {
        face_with_iris_offset(offset_x, offset_y).landmarks
    }

    #[test]
    fn centered_iris_reads_center() {
        let config = MonitorConfig::default();
        let reading = iris_gaze(&landmarks_with_offset(0.0, 0.0), &config).unwrap();
        assert_eq!(reading.direction, GazeDirection::Center);
        assert!(!reading.is_looking_away);
        assert!(reading.deviation < 1e-9);
    }

    #[test]
    fn horizontal_offset_past_threshold_is_looking_away() {
        let config = MonitorConfig::default();
        let reading = iris_gaze(&landmarks_with_offset(0.25, 0.0), &config).unwrap();
        assert_ne!(reading.direction, GazeDirection::Center);
        assert_eq!(reading.direction, GazeDirection::Left);
        assert!(reading.is_looking_away);
        assert!((reading.deviation - 0.25).abs() < 1e-9);
    }

    #[test]
    fn mirrored_sign_maps_negative_offset_right() {
        let config = MonitorConfig::default();
        let reading = iris_gaze(&landmarks_with_offset(-0.3, 0.0), &config).unwrap();
        assert_eq!(reading.direction, GazeDirection::Right);
    }

    #[test]
    fn vertical_offset_dominates_when_larger() {
        let config = MonitorConfig::default();
        let reading = iris_gaze(&landmarks_with_offset(0.05, 0.3), &config).unwrap();
        assert_eq!(reading.direction, GazeDirection::Down);
        assert!(reading.is_looking_away);
    }

    #[test]
    fn sub_threshold_offsets_stay_center() {
        let config = MonitorConfig::default();
        let reading = iris_gaze(&landmarks_with_offset(0.08, 0.10), &config).unwrap();
        assert_eq!(reading.direction, GazeDirection::Center);
        assert!(!reading.is_looking_away);
    }

    #[test]
    fn missing_iris_landmarks_yield_none() {
        let config = MonitorConfig::default();
        let landmarks = vec![Landmark::new(0.5, 0.5); 468];
        assert!(iris_gaze(&landmarks, &config).is_none());
    }
}

//! Head pose from the landmark model's 4x4 transformation matrix.

use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;

use super::GazeDirection;

/// Pitch/yaw/roll in degrees, camera-relative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadPose {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

pub const IDENTITY_TRANSFORM: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Euler decomposition of the rotation sub-block of a column-major 4x4
/// transform. With r[col][row] = m[col * 4 + row]:
/// pitch = atan2(r21, r22), yaw = atan2(-r20, |r0|), roll = atan2(r10, r00).
pub fn from_transform(m: &[f64; 16]) -> HeadPose {
    let pitch = m[6].atan2(m[10]);
    let yaw = (-m[2]).atan2((m[0] * m[0] + m[1] * m[1]).sqrt());
    let roll = m[1].atan2(m[0]);

    HeadPose {
        pitch: pitch.to_degrees(),
        yaw: yaw.to_degrees(),
        roll: roll.to_degrees(),
    }
}

/// Secondary gaze signal from head pose alone. Yaw decides when it is
/// both past its threshold and the dominant axis; pitch decides when
/// yaw does not; a pose past threshold on neither decisive axis reads
/// as a generic `away`.
///
/// The yaw sign is flipped on classification because source frames are
/// mirrored: a positive (camera-left) rotation is the user turning to
/// their left.
pub fn head_gaze(pose: &HeadPose, config: &MonitorConfig) -> GazeDirection {
    let yaw_mag = pose.yaw.abs();
    let pitch_mag = pose.pitch.abs();

    if yaw_mag < config.head_yaw_threshold && pitch_mag < config.head_pitch_threshold {
        GazeDirection::Center
    } else if yaw_mag >= config.head_yaw_threshold && yaw_mag >= pitch_mag {
        if pose.yaw > 0.0 {
            GazeDirection::Left
        } else {
            GazeDirection::Right
        }
    } else if pitch_mag >= config.head_pitch_threshold && pitch_mag > yaw_mag {
        if pose.pitch > 0.0 {
            GazeDirection::Up
        } else {
            GazeDirection::Down
        }
    } else {
        GazeDirection::Away
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation_y(degrees: f64) -> [f64; 16] {
        let r = degrees.to_radians();
        let (sin, cos) = r.sin_cos();
        [
            cos, 0.0, -sin, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            sin, 0.0, cos, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }

    fn rotation_x(degrees: f64) -> [f64; 16] {
        let r = degrees.to_radians();
        let (sin, cos) = r.sin_cos();
        [
            1.0, 0.0, 0.0, 0.0, //
            0.0, cos, sin, 0.0, //
            0.0, -sin, cos, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }

    #[test]
    fn identity_is_zero_pose() {
        let pose = from_transform(&IDENTITY_TRANSFORM);
        assert!(pose.pitch.abs() < 1e-9);
        assert!(pose.yaw.abs() < 1e-9);
        assert!(pose.roll.abs() < 1e-9);
    }

    #[test]
    fn yaw_rotation_recovers_angle() {
        let pose = from_transform(&rotation_y(30.0));
        assert!((pose.yaw - 30.0).abs() < 1e-6, "yaw was {}", pose.yaw);
        assert!(pose.pitch.abs() < 1e-6);
    }

    #[test]
    fn pitch_rotation_recovers_angle() {
        let pose = from_transform(&rotation_x(25.0));
        assert!((pose.pitch - 25.0).abs() < 1e-6, "pitch was {}", pose.pitch);
        assert!(pose.yaw.abs() < 1e-6);
    }

    #[test]
    fn small_pose_is_center() {
        let config = MonitorConfig::default();
        let pose = HeadPose {
            pitch: 10.0,
            yaw: -15.0,
            roll: 0.0,
        };
        assert_eq!(head_gaze(&pose, &config), GazeDirection::Center);
    }

    #[test]
    fn dominant_yaw_wins_with_mirrored_sign() {
        let config = MonitorConfig::default();
        let pose = HeadPose {
            pitch: 5.0,
            yaw: 28.0,
            roll: 0.0,
        };
        assert_eq!(head_gaze(&pose, &config), GazeDirection::Left);

        let pose = HeadPose {
            pitch: 5.0,
            yaw: -28.0,
            roll: 0.0,
        };
        assert_eq!(head_gaze(&pose, &config), GazeDirection::Right);
    }

    #[test]
    fn dominant_pitch_reads_vertical() {
        let config = MonitorConfig::default();
        let pose = HeadPose {
            pitch: -22.0,
            yaw: 4.0,
            roll: 0.0,
        };
        assert_eq!(head_gaze(&pose, &config), GazeDirection::Down);
    }

    #[test]
    fn indecisive_pose_is_away() {
        let config = MonitorConfig::default();
        // Pitch past its threshold but smaller than a sub-threshold yaw:
        // neither axis is decisive.
        let pose = HeadPose {
            pitch: 16.0,
            yaw: 19.0,
            roll: 0.0,
        };
        assert_eq!(head_gaze(&pose, &config), GazeDirection::Away);
    }
}

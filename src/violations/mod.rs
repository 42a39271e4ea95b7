//! Violation classification.
//!
//! Maps one frame assessment to zero or more violation candidates.
//! Candidates still have to pass the per-kind debouncer before they
//! become events; plain observations (face present, gaze centered)
//! never leave this layer.

mod debounce;

pub use debounce::Debouncer;

use serde_json::json;

use crate::config::MonitorConfig;
use crate::db::models::{Severity, ViolationKind};
use crate::metrics::FrameAssessment;

#[derive(Debug, Clone)]
pub struct ViolationCandidate {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub confidence: f64,
    pub message: String,
    pub metadata: serde_json::Value,
}

pub fn classify(assessment: &FrameAssessment, config: &MonitorConfig) -> Vec<ViolationCandidate> {
    let metrics = &assessment.metrics;
    let mut candidates = Vec::new();

    if !metrics.face_detected {
        if assessment.seconds_since_last_face > config.no_face_grace_secs {
            candidates.push(ViolationCandidate {
                kind: ViolationKind::NoFace,
                severity: Severity::High,
                confidence: 0.9,
                message: format!(
                    "No face detected for {:.1}s",
                    assessment.seconds_since_last_face
                ),
                metadata: json!({
                    "secondsSinceLastFace": assessment.seconds_since_last_face,
                }),
            });
        }
        return candidates;
    }

    if metrics.face_count > 1 {
        candidates.push(ViolationCandidate {
            kind: ViolationKind::MultipleFaces,
            severity: Severity::High,
            confidence: 1.0,
            message: format!("{} faces detected in frame", metrics.face_count),
            metadata: json!({ "faceCount": metrics.face_count }),
        });
        return candidates;
    }

    if let Some(decision) = &assessment.looking_away {
        candidates.push(ViolationCandidate {
            kind: ViolationKind::LookingAway,
            severity: Severity::Medium,
            confidence: decision.confidence,
            message: format!("Candidate looking {}", decision.direction.as_str()),
            metadata: json!({
                "gazeDirection": decision.direction.as_str(),
                "deviation": decision.deviation,
                "headYaw": metrics.head_pose.yaw,
                "headPitch": metrics.head_pose.pitch,
            }),
        });
    }

    candidates
}

/// Tab switches arrive from page-visibility signals rather than frame
/// metrics, but flow through the same candidate contract.
pub fn tab_switch_candidate() -> ViolationCandidate {
    ViolationCandidate {
        kind: ViolationKind::TabSwitch,
        severity: Severity::High,
        confidence: 1.0,
        message: "Candidate left the interview tab".to_string(),
        metadata: json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GazeDirection, HeadPose};
    use crate::metrics::{LookingAwayDecision, ProctoringMetrics};

    fn assessment(metrics: ProctoringMetrics, seconds_since_last_face: f64) -> FrameAssessment {
        FrameAssessment {
            metrics,
            looking_away: None,
            seconds_since_last_face,
        }
    }

    fn no_face_metrics(attention: f64) -> ProctoringMetrics {
        ProctoringMetrics {
            face_detected: false,
            face_count: 0,
            attention_score: attention,
            gaze_direction: GazeDirection::Away,
            head_pose: HeadPose::default(),
            iris_deviation: 0.0,
            face_distance: None,
            lighting_quality: None,
        }
    }

    fn present_metrics(face_count: u32) -> ProctoringMetrics {
        ProctoringMetrics {
            face_detected: true,
            face_count,
            attention_score: 100.0,
            gaze_direction: GazeDirection::Center,
            head_pose: HeadPose::default(),
            iris_deviation: 0.0,
            face_distance: None,
            lighting_quality: None,
        }
    }

    #[test]
    fn no_face_fires_only_past_the_grace_period() {
        let config = MonitorConfig::default();

        let early = classify(&assessment(no_face_metrics(95.0), 1.0), &config);
        assert!(early.is_empty());

        let late = classify(&assessment(no_face_metrics(85.0), 2.4), &config);
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].kind, ViolationKind::NoFace);
        assert_eq!(late[0].severity, Severity::High);
    }

    #[test]
    fn multiple_faces_beats_gaze() {
        let config = MonitorConfig::default();
        let mut assessment = assessment(present_metrics(3), 0.0);
        // Even with a stale looking-away decision attached, face count wins.
        assessment.looking_away = Some(LookingAwayDecision {
            confidence: 0.75,
            direction: GazeDirection::Left,
            deviation: 0.3,
        });

        let candidates = classify(&assessment, &config);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, ViolationKind::MultipleFaces);
    }

    #[test]
    fn looking_away_carries_decision_confidence() {
        let config = MonitorConfig::default();
        let mut assessment = assessment(present_metrics(1), 0.0);
        assessment.looking_away = Some(LookingAwayDecision {
            confidence: 0.95,
            direction: GazeDirection::Right,
            deviation: 0.4,
        });

        let candidates = classify(&assessment, &config);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, ViolationKind::LookingAway);
        assert_eq!(candidates[0].severity, Severity::Medium);
        assert!((candidates[0].confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn centered_single_face_yields_nothing() {
        let config = MonitorConfig::default();
        let candidates = classify(&assessment(present_metrics(1), 0.0), &config);
        assert!(candidates.is_empty());
    }
}

//! Proctoring session data model.
//!
//! One row per monitored interview sitting. Counters are bumped
//! incrementally by the event pipeline while the session is active;
//! the derived fields (integrity score, risk level, patterns) are
//! written exactly once at finalize, after which the row is sealed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Active,
    Finalized,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Active => "Active",
            SessionPhase::Finalized => "Finalized",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "VERY_LOW",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// High-risk sessions flag their parent interview.
    pub fn requires_escalation(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Finalize-time correlation finding between looking-away events and
/// question timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousPatterns {
    pub is_suspicious: bool,
    pub confidence: f64,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctoringSession {
    pub id: String,
    pub interview_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_duration_seconds: u64,
    pub total_violations: u64,
    pub no_face_count: u64,
    pub multiple_faces_count: u64,
    pub looking_away_count: u64,
    pub tab_switch_count: u64,
    pub average_attention_score: f64,
    pub integrity_score: u8,
    pub risk_level: RiskLevel,
    pub suspicious_patterns: Option<SuspiciousPatterns>,
    pub phase: SessionPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProctoringSession {
    /// A fresh active session with zeroed counters and neutral scores.
    pub fn begin(interview_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            interview_id: interview_id.to_string(),
            started_at,
            ended_at: None,
            total_duration_seconds: 0,
            total_violations: 0,
            no_face_count: 0,
            multiple_faces_count: 0,
            looking_away_count: 0,
            tab_switch_count: 0,
            average_attention_score: 100.0,
            integrity_score: 100,
            risk_level: RiskLevel::VeryLow,
            suspicious_patterns: None,
            phase: SessionPhase::Active,
            created_at: started_at,
            updated_at: started_at,
        }
    }
}

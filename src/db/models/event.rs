//! Violation event data model.
//!
//! Only violations are ever persisted: the kind enum is closed over
//! the four violation types, so a plain "face detected" observation
//! has no representation here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    NoFace,
    MultipleFaces,
    LookingAway,
    TabSwitch,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::NoFace => "no_face",
            ViolationKind::MultipleFaces => "multiple_faces",
            ViolationKind::LookingAway => "looking_away",
            ViolationKind::TabSwitch => "tab_switch",
        }
    }

    pub const ALL: [ViolationKind; 4] = [
        ViolationKind::NoFace,
        ViolationKind::MultipleFaces,
        ViolationKind::LookingAway,
        ViolationKind::TabSwitch,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctoringEvent {
    pub id: String,
    pub session_id: String,
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub severity: Severity,
    pub message: String,
    pub metadata: serde_json::Value,
    pub question_index: Option<u32>,
}

impl ProctoringEvent {
    pub fn new(
        session_id: &str,
        kind: ViolationKind,
        timestamp: DateTime<Utc>,
        confidence: f64,
        severity: Severity,
        message: String,
        metadata: serde_json::Value,
        question_index: Option<u32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            kind,
            timestamp,
            confidence,
            severity,
            message,
            metadata,
            question_index,
        }
    }
}

/// Per-kind violation tallies, used both for batch counter bumps and
/// finalize-time scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationCounts {
    pub no_face: u64,
    pub multiple_faces: u64,
    pub looking_away: u64,
    pub tab_switch: u64,
}

impl ViolationCounts {
    pub fn record(&mut self, kind: ViolationKind) {
        match kind {
            ViolationKind::NoFace => self.no_face += 1,
            ViolationKind::MultipleFaces => self.multiple_faces += 1,
            ViolationKind::LookingAway => self.looking_away += 1,
            ViolationKind::TabSwitch => self.tab_switch += 1,
        }
    }

    pub fn get(&self, kind: ViolationKind) -> u64 {
        match kind {
            ViolationKind::NoFace => self.no_face,
            ViolationKind::MultipleFaces => self.multiple_faces,
            ViolationKind::LookingAway => self.looking_away,
            ViolationKind::TabSwitch => self.tab_switch,
        }
    }

    pub fn total(&self) -> u64 {
        self.no_face + self.multiple_faces + self.looking_away + self.tab_switch
    }

    pub fn tally<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a ProctoringEvent>,
    {
        let mut counts = Self::default();
        for event in events {
            counts.record(event.kind);
        }
        counts
    }
}

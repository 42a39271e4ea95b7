mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{
    AttentionSnapshot, Interview, ProctoringEvent, ProctoringSession, QuestionMark, RiskLevel,
    SessionPhase, Severity, SuspiciousPatterns, ViolationCounts, ViolationKind,
};

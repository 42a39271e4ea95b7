pub mod event;
pub mod interview;
pub mod question_mark;
pub mod session;
pub mod snapshot;

pub use event::{ProctoringEvent, Severity, ViolationCounts, ViolationKind};
pub use interview::Interview;
pub use question_mark::QuestionMark;
pub use session::{ProctoringSession, RiskLevel, SessionPhase, SuspiciousPatterns};
pub use snapshot::AttentionSnapshot;

//! Question timing marks.
//!
//! The interview layer reports when each question is asked; finalize
//! correlates these against the looking-away event stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMark {
    pub id: Option<i64>,
    pub session_id: String,
    pub question_index: u32,
    pub asked_at: DateTime<Utc>,
}

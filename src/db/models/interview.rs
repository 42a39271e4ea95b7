//! Minimal parent interview record.
//!
//! The interview itself lives in another system; this table exists so
//! high-risk sessions have a durable place to raise their flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub integrity_flagged: bool,
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::Interview,
};

impl Database {
    /// Insert the parent interview row if this is the first session
    /// opened against it.
    pub async fn ensure_interview(&self, interview_id: &str, now: DateTime<Utc>) -> Result<()> {
        let interview_id = interview_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO interviews (id, created_at, integrity_flagged)
                 VALUES (?1, ?2, 0)",
                params![interview_id, now.to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn flag_interview(&self, interview_id: &str) -> Result<()> {
        let interview_id = interview_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE interviews SET integrity_flagged = 1 WHERE id = ?1",
                params![interview_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_interview(&self, interview_id: &str) -> Result<Option<Interview>> {
        let interview_id = interview_id.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, created_at, integrity_flagged FROM interviews WHERE id = ?1",
                    params![interview_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )
                .optional()?;

            match row {
                Some((id, created_at, flagged)) => Ok(Some(Interview {
                    id,
                    created_at: parse_datetime(&created_at, "created_at")?,
                    integrity_flagged: flagged != 0,
                })),
                None => Ok(None),
            }
        })
        .await
    }
}

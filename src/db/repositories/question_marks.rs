use anyhow::Result;
use rusqlite::params;

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::QuestionMark,
};

impl Database {
    pub async fn insert_question_mark(&self, mark: &QuestionMark) -> Result<()> {
        let record = mark.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO question_marks (session_id, question_index, asked_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    record.session_id,
                    i64::from(record.question_index),
                    record.asked_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_question_marks(&self, session_id: &str) -> Result<Vec<QuestionMark>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, question_index, asked_at
                 FROM question_marks
                 WHERE session_id = ?1
                 ORDER BY asked_at ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut marks = Vec::new();
            while let Some(row) = rows.next()? {
                let asked_at: String = row.get(3)?;
                let question_index: i64 = row.get(2)?;
                marks.push(QuestionMark {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    question_index: question_index as u32,
                    asked_at: parse_datetime(&asked_at, "asked_at")?,
                });
            }

            Ok(marks)
        })
        .await
    }
}

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, helpers::row_to_session, models::SleepSession};
use crate::store::SessionStore;

const SELECT_COLUMNS: &str = "SELECT id, start_time_ms, end_time_ms, quality FROM sleep_sessions";

impl Database {
    pub async fn insert_session(&self, session: &SleepSession) -> Result<i64> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sleep_sessions (start_time_ms, end_time_ms, quality)
                 VALUES (?1, ?2, ?3)",
                params![
                    record.start_time_ms,
                    record.end_time_ms,
                    record.quality.map(|q| q.as_i64()),
                ],
            )
            .with_context(|| "failed to insert sleep session")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn update_session(&self, session: &SleepSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE sleep_sessions
                     SET start_time_ms = ?1,
                         end_time_ms = ?2,
                         quality = ?3
                     WHERE id = ?4",
                    params![
                        record.start_time_ms,
                        record.end_time_ms,
                        record.quality.map(|q| q.as_i64()),
                        record.id,
                    ],
                )
                .with_context(|| "failed to update sleep session")?;
            if changed == 0 {
                bail!("sleep session {} does not exist", record.id);
            }
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: i64) -> Result<Option<SleepSession>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            let session = stmt
                .query_row(params![session_id], |row| Ok(row_to_session(row)))
                .optional()?
                .transpose()?;
            Ok(session)
        })
        .await
    }

    pub async fn get_most_recent_session(&self) -> Result<Option<SleepSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT 1"))?;

            let mut rows = stmt.query([])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SleepSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC"))?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn delete_all_sessions(&self) -> Result<usize> {
        self.execute(|conn| {
            let deleted = conn
                .execute("DELETE FROM sleep_sessions", [])
                .with_context(|| "failed to clear sleep sessions")?;
            Ok(deleted)
        })
        .await
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn get_all(&self) -> Result<Vec<SleepSession>> {
        self.list_sessions().await
    }

    async fn get_most_recent(&self) -> Result<Option<SleepSession>> {
        self.get_most_recent_session().await
    }

    async fn get(&self, id: i64) -> Result<Option<SleepSession>> {
        self.get_session(id).await
    }

    async fn insert(&self, session: &SleepSession) -> Result<i64> {
        self.insert_session(session).await
    }

    async fn update(&self, session: &SleepSession) -> Result<()> {
        self.update_session(session).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.delete_all_sessions().await.map(|_| ())
    }
}

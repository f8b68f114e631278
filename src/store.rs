use anyhow::Result;
use async_trait::async_trait;

use crate::db::SleepSession;

/// Persistence operations the tracker relies on. Each call is atomic on its
/// own; nothing spans more than one call.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All sessions, most recent first.
    async fn get_all(&self) -> Result<Vec<SleepSession>>;

    async fn get_most_recent(&self) -> Result<Option<SleepSession>>;

    async fn get(&self, id: i64) -> Result<Option<SleepSession>>;

    /// Store a new session and return the id assigned to it.
    async fn insert(&self, session: &SleepSession) -> Result<i64>;

    async fn update(&self, session: &SleepSession) -> Result<()>;

    async fn delete_all(&self) -> Result<()>;
}

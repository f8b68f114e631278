use anyhow::{anyhow, Result};
use log::info;

use crate::{
    db::{SleepQuality, SleepSession},
    store::SessionStore,
};

/// Records how well the user slept for a stored session.
pub async fn rate_session(
    store: &dyn SessionStore,
    session_id: i64,
    quality: SleepQuality,
) -> Result<SleepSession> {
    let mut session = store
        .get(session_id)
        .await?
        .ok_or_else(|| anyhow!("sleep session {session_id} not found"))?;

    session.quality = Some(quality);
    store.update(&session).await?;

    info!("Rated sleep session {session_id} as {}", quality.label());
    Ok(session)
}

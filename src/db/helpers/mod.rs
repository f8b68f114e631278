use anyhow::{Context, Result};
use rusqlite::Row;

use crate::db::models::{SleepQuality, SleepSession};

pub fn parse_quality(value: Option<i64>) -> Result<Option<SleepQuality>> {
    value
        .map(SleepQuality::from_i64)
        .transpose()
        .context("failed to parse quality")
}

pub fn row_to_session(row: &Row) -> Result<SleepSession> {
    let quality: Option<i64> = row.get("quality")?;

    Ok(SleepSession {
        id: row.get("id")?,
        start_time_ms: row.get("start_time_ms")?,
        end_time_ms: row.get("end_time_ms")?,
        quality: parse_quality(quality)?,
    })
}

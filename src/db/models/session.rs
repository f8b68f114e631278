//! Sleep session data models.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::SleepQuality;

/// One sleep interval. `end_time_ms == start_time_ms` marks it as still open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SleepSession {
    /// Assigned by the store; `0` until the session has been inserted.
    pub id: i64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub quality: Option<SleepQuality>,
}

impl SleepSession {
    /// A fresh, unsaved session that starts (and provisionally ends) at `now_ms`.
    pub fn open_at(now_ms: i64) -> Self {
        Self {
            id: 0,
            start_time_ms: now_ms,
            end_time_ms: now_ms,
            quality: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time_ms == self.start_time_ms
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_time_ms.saturating_sub(self.start_time_ms).max(0)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.start_time_ms)
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        millis_to_datetime(self.end_time_ms)
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

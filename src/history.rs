//! Plain-text rendering of the session log shown under the tracker buttons.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

use crate::db::SleepSession;

const TITLE: &str = "Here is your sleep data";
const TIMESTAMP_FORMAT: &str = "%A %b-%d-%Y Time: %H:%M";
const UNRATED: &str = "--";

#[derive(Debug, Clone, Copy)]
pub struct HistoryFormatter {
    offset: FixedOffset,
}

impl Default for HistoryFormatter {
    fn default() -> Self {
        Self::local()
    }
}

impl HistoryFormatter {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Uses the machine's current UTC offset.
    pub fn local() -> Self {
        Self::new(Local::now().offset().fix())
    }

    /// `None` when the offset is beyond ±24h.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn format(&self, sessions: &[SleepSession]) -> String {
        let mut out = String::from(TITLE);
        out.push('\n');

        for session in sessions {
            out.push('\n');
            let _ = writeln!(out, "Start:\t{}", self.timestamp(session.started_at()));
            if session.is_open() {
                continue;
            }
            let _ = writeln!(out, "End:\t{}", self.timestamp(session.ended_at()));
            let quality = session.quality.map(|q| q.label()).unwrap_or(UNRATED);
            let _ = writeln!(out, "Quality:\t{quality}");
            let _ = writeln!(
                out,
                "Hours:Minutes:Seconds:\t{}",
                format_duration(session.duration_ms())
            );
        }

        out
    }

    fn timestamp(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }
}

fn format_duration(ms: i64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

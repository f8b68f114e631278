use serde::Serialize;

use crate::db::SleepSession;
use crate::history::HistoryFormatter;

/// Everything the tracker screen binds to, republished as one snapshot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    pub current_session: Option<SleepSession>,
    pub history_text: String,
    pub start_visible: bool,
    pub stop_visible: bool,
    pub clear_visible: bool,
}

impl TrackerState {
    pub fn derive(
        current_session: Option<SleepSession>,
        sessions: &[SleepSession],
        formatter: &HistoryFormatter,
    ) -> Self {
        let tracking = current_session.is_some();
        Self {
            current_session,
            history_text: formatter.format(sessions),
            start_visible: !tracking,
            stop_visible: tracking,
            clear_visible: !sessions.is_empty(),
        }
    }

    /// Swaps in a new current session without touching the history text.
    /// A session being tracked implies there is something to clear.
    pub(crate) fn adopt_current(&mut self, current_session: Option<SleepSession>) {
        let tracking = current_session.is_some();
        self.current_session = current_session;
        self.start_visible = !tracking;
        self.stop_visible = tracking;
        self.clear_visible |= tracking;
    }

    pub fn is_tracking(&self) -> bool {
        self.current_session.is_some()
    }
}

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::Notify;

use crate::db::SleepSession;

/// One-shot notifications for the UI. An event stays pending until the
/// matching `acknowledge_*` call removes it. At most one event of each kind
/// is pending; a newer one replaces the older.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type", content = "session")]
pub enum TrackerEvent {
    /// A session was just closed; the UI should ask for its quality rating.
    NavigateToRating(SleepSession),
    /// History was wiped; the UI should confirm it.
    ShowClearedMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventKind {
    NavigateToRating,
    ShowClearedMessage,
}

impl TrackerEvent {
    pub(crate) fn kind(&self) -> EventKind {
        match self {
            TrackerEvent::NavigateToRating(_) => EventKind::NavigateToRating,
            TrackerEvent::ShowClearedMessage => EventKind::ShowClearedMessage,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    pending: Mutex<VecDeque<TrackerEvent>>,
    notify: Notify,
}

impl EventQueue {
    pub(crate) fn push(&self, event: TrackerEvent) {
        {
            let mut pending = self.lock();
            let kind = event.kind();
            pending.retain(|queued| queued.kind() != kind);
            pending.push_back(event);
        }
        self.notify.notify_waiters();
    }

    pub(crate) fn peek(&self) -> Option<TrackerEvent> {
        self.lock().front().cloned()
    }

    /// Removes the oldest pending event of `kind`.
    pub(crate) fn acknowledge(&self, kind: EventKind) -> Option<TrackerEvent> {
        let mut pending = self.lock();
        let position = pending.iter().position(|event| event.kind() == kind)?;
        pending.remove(position)
    }

    /// Resolves once an event is pending. Does not consume it.
    pub(crate) async fn wait(&self) -> TrackerEvent {
        loop {
            let notified = self.notify.notified();
            if let Some(event) = self.peek() {
                return event;
            }
            notified.await;
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<TrackerEvent>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

use std::{fmt, future::Future, sync::Arc};

use anyhow::Result;
use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    db::SleepSession,
    history::HistoryFormatter,
    store::SessionStore,
};

use super::{
    events::{EventKind, EventQueue},
    TrackerEvent, TrackerState,
};

/// Returned by tracker operations that were still waiting on the store
/// when the tracker was closed. Nothing is published for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("session tracker was closed")
    }
}

impl std::error::Error for Cancelled {}

struct TrackerInner {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    formatter: HistoryFormatter,
    /// The open session, if any. Held for the full length of every
    /// operation so start/stop/clear never interleave.
    current: Mutex<Option<SleepSession>>,
    state_tx: watch::Sender<TrackerState>,
    events: EventQueue,
    cancel_token: CancellationToken,
}

impl Drop for TrackerInner {
    fn drop(&mut self) {
        if !self.cancel_token.is_cancelled() {
            self.cancel_token.cancel();
        }
    }
}

/// Drives the tracker screen: owns the open session, republishes derived
/// state after every change and queues one-shot UI events.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<TrackerInner>,
}

impl SessionTracker {
    /// Builds the tracker and adopts the most recent stored session if it
    /// is still open.
    pub async fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        formatter: HistoryFormatter,
    ) -> Result<Self> {
        let (state_tx, _) = watch::channel(TrackerState::derive(None, &[], &formatter));

        let tracker = Self {
            inner: Arc::new(TrackerInner {
                store,
                clock,
                formatter,
                current: Mutex::new(None),
                state_tx,
                events: EventQueue::default(),
                cancel_token: CancellationToken::new(),
            }),
        };

        tracker.initialize().await?;
        Ok(tracker)
    }

    async fn initialize(&self) -> Result<()> {
        let mut current = self.inner.current.lock().await;

        let tonight = self.load_open_session().await?;
        let sessions = self.guarded(self.inner.store.get_all()).await?;
        self.ensure_live()?;

        match &tonight {
            Some(session) => info!("Resuming open sleep session {}", session.id),
            None => debug!("No open sleep session found"),
        }

        *current = tonight;
        self.publish(current.clone(), &sessions);
        Ok(())
    }

    pub fn state(&self) -> TrackerState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.inner.state_tx.subscribe()
    }

    pub async fn current_session(&self) -> Option<SleepSession> {
        self.inner.current.lock().await.clone()
    }

    /// Opens a new session stamped with the current time. Does nothing when
    /// a session is already open.
    pub async fn start_tracking(&self) -> Result<()> {
        let mut current = self.inner.current.lock().await;
        if let Some(open) = current.as_ref() {
            debug!("Ignoring start: session {} is already open", open.id);
            return Ok(());
        }

        let session = SleepSession::open_at(self.inner.clock.now_ms());
        let started_at = session.start_time_ms;
        let id = self.guarded(self.inner.store.insert(&session)).await?;

        // The row exists from here on, whatever the history reload does.
        *current = Some(SleepSession { id, ..session });
        let published = self.reload_and_publish(current.clone()).await;
        if !is_cancelled(&published) {
            info!("Started sleep session {id} at {started_at}");
        }
        published
    }

    /// Closes the open session and queues a rating prompt for it. Returns
    /// the closed session, or `None` when nothing was open.
    pub async fn stop_tracking(&self) -> Result<Option<SleepSession>> {
        let mut current = self.inner.current.lock().await;
        let Some(open) = current.as_ref() else {
            debug!("Ignoring stop: no open session");
            return Ok(None);
        };

        let mut closed = open.clone();
        // An end equal to the start would read back as still open.
        closed.end_time_ms = self
            .inner
            .clock
            .now_ms()
            .max(closed.start_time_ms.saturating_add(1));

        self.guarded(self.inner.store.update(&closed)).await?;

        *current = None;
        let published = self.reload_and_publish(None).await;
        if is_cancelled(&published) {
            return Err(Cancelled.into());
        }

        info!(
            "Stopped sleep session {} after {}ms",
            closed.id,
            closed.duration_ms()
        );
        self.inner
            .events
            .push(TrackerEvent::NavigateToRating(closed.clone()));
        published.map(|()| Some(closed))
    }

    /// Deletes every stored session. Irreversible.
    pub async fn clear_history(&self) -> Result<()> {
        let mut current = self.inner.current.lock().await;

        self.guarded(self.inner.store.delete_all()).await?;

        *current = None;
        let published = self.reload_and_publish(None).await;
        if is_cancelled(&published) {
            return published;
        }

        info!("Cleared sleep history");
        self.inner.events.push(TrackerEvent::ShowClearedMessage);
        published
    }

    /// Re-reads the store, e.g. after a rating was saved elsewhere.
    pub async fn refresh(&self) -> Result<()> {
        let current = self.inner.current.lock().await;
        let sessions = self.guarded(self.inner.store.get_all()).await?;
        self.ensure_live()?;
        self.publish(current.clone(), &sessions);
        Ok(())
    }

    pub fn pending_event(&self) -> Option<TrackerEvent> {
        self.inner.events.peek()
    }

    /// Waits for the oldest pending event without consuming it. `None` once
    /// the tracker is closed.
    pub async fn next_event(&self) -> Option<TrackerEvent> {
        tokio::select! {
            biased;
            _ = self.inner.cancel_token.cancelled() => None,
            event = self.inner.events.wait() => Some(event),
        }
    }

    pub fn acknowledge_navigation(&self) {
        if self
            .inner
            .events
            .acknowledge(EventKind::NavigateToRating)
            .is_none()
        {
            debug!("No pending navigation to acknowledge");
        }
    }

    pub fn acknowledge_cleared_message(&self) {
        if self
            .inner
            .events
            .acknowledge(EventKind::ShowClearedMessage)
            .is_none()
        {
            debug!("No pending cleared message to acknowledge");
        }
    }

    /// Cancels in-flight operations. Safe to call more than once.
    pub fn close(&self) {
        if self.inner.cancel_token.is_cancelled() {
            return;
        }
        info!("Closing session tracker");
        self.inner.cancel_token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel_token.is_cancelled()
    }

    async fn load_open_session(&self) -> Result<Option<SleepSession>> {
        let recent = self.guarded(self.inner.store.get_most_recent()).await?;
        Ok(recent.filter(SleepSession::is_open))
    }

    /// Runs a store call unless the tracker is closed first.
    async fn guarded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.inner.cancel_token.cancelled() => {
                warn!("Store operation abandoned: tracker closed");
                Err(Cancelled.into())
            }
            result = operation => result,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.inner.cancel_token.is_cancelled() {
            return Err(Cancelled.into());
        }
        Ok(())
    }

    /// Republishes after a write the store already accepted. If the history
    /// reload fails the flags still follow `current`; the error is returned.
    async fn reload_and_publish(&self, current: Option<SleepSession>) -> Result<()> {
        let reloaded = self.guarded(self.inner.store.get_all()).await;
        self.ensure_live()?;

        match reloaded {
            Ok(sessions) => {
                self.publish(current, &sessions);
                Ok(())
            }
            Err(err) => {
                warn!("History reload failed after a successful write: {err:#}");
                self.inner
                    .state_tx
                    .send_modify(|state| state.adopt_current(current));
                Err(err)
            }
        }
    }

    fn publish(&self, current: Option<SleepSession>, sessions: &[SleepSession]) {
        let state = TrackerState::derive(current, sessions, &self.inner.formatter);
        self.inner.state_tx.send_replace(state);
    }
}

fn is_cancelled<T>(result: &Result<T>) -> bool {
    matches!(result, Err(err) if err.is::<Cancelled>())
}

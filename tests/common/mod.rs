#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use sleeptracker_lib::{
    clock::ManualClock, db::SleepSession, history::HistoryFormatter, store::SessionStore,
    tracker::SessionTracker,
};
use tokio::sync::RwLock;

/// In-memory store with knobs for failure and stalling.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<Vec<SleepSession>>,
    next_id: Mutex<i64>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    /// Every call takes a read lock; tests hold the write lock to stall calls.
    pub gate: RwLock<()>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Vec<SleepSession> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `get_all` and `get_most_recent` fail; writes still go through.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_readable(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("transient read failure");
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<SleepSession>> {
        let _gate = self.gate.read().await;
        self.check_readable()?;
        let mut sessions = self.snapshot();
        sessions.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(sessions)
    }

    async fn get_most_recent(&self) -> Result<Option<SleepSession>> {
        let _gate = self.gate.read().await;
        self.check_readable()?;
        Ok(self.snapshot().into_iter().max_by_key(|s| s.id))
    }

    async fn get(&self, id: i64) -> Result<Option<SleepSession>> {
        let _gate = self.gate.read().await;
        Ok(self.snapshot().into_iter().find(|s| s.id == id))
    }

    async fn insert(&self, session: &SleepSession) -> Result<i64> {
        let _gate = self.gate.read().await;
        self.check_writable()?;
        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            *next_id
        };
        self.sessions.lock().unwrap().push(SleepSession {
            id,
            ..session.clone()
        });
        Ok(id)
    }

    async fn update(&self, session: &SleepSession) -> Result<()> {
        let _gate = self.gate.read().await;
        self.check_writable()?;
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => bail!("no session {}", session.id),
        }
    }

    async fn delete_all(&self) -> Result<()> {
        let _gate = self.gate.read().await;
        self.check_writable()?;
        self.sessions.lock().unwrap().clear();
        Ok(())
    }
}

pub fn utc_formatter() -> HistoryFormatter {
    HistoryFormatter::with_offset_minutes(0).unwrap()
}

pub async fn tracker_with(store: Arc<MemoryStore>, clock: &ManualClock) -> SessionTracker {
    SessionTracker::new(store, Arc::new(clock.clone()), utc_formatter())
        .await
        .unwrap()
}

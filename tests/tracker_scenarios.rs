mod common;

use std::{sync::Arc, time::Duration};

use common::{tracker_with, MemoryStore};
use sleeptracker_lib::{
    clock::ManualClock,
    db::SleepSession,
    store::SessionStore,
    tracker::{Cancelled, TrackerEvent},
};

#[tokio::test]
async fn start_stop_clear_night() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;

    let state = tracker.state();
    assert!(state.current_session.is_none());
    assert!(state.start_visible);
    assert!(!state.stop_visible);
    assert!(!state.clear_visible);

    tracker.start_tracking().await.unwrap();
    let stored = store.snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!((stored[0].start_time_ms, stored[0].end_time_ms), (100, 100));
    let state = tracker.state();
    assert!(state.stop_visible && !state.start_visible && state.clear_visible);

    clock.set(200);
    tracker.stop_tracking().await.unwrap();
    let stored = store.snapshot();
    assert_eq!((stored[0].start_time_ms, stored[0].end_time_ms), (100, 200));
    assert_eq!(
        tracker.pending_event(),
        Some(TrackerEvent::NavigateToRating(stored[0].clone()))
    );
    let state = tracker.state();
    assert!(state.start_visible && !state.stop_visible);
    assert!(state.history_text.contains("End:"));

    tracker.acknowledge_navigation();
    assert!(tracker.pending_event().is_none());

    tracker.clear_history().await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());
    assert!(!tracker.state().clear_visible);
    assert_eq!(tracker.pending_event(), Some(TrackerEvent::ShowClearedMessage));

    tracker.acknowledge_cleared_message();
    assert!(tracker.pending_event().is_none());
}

#[tokio::test]
async fn start_then_most_recent_is_open() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(1_000);
    let tracker = tracker_with(store.clone(), &clock).await;

    tracker.start_tracking().await.unwrap();
    let recent = store.get_most_recent().await.unwrap().unwrap();
    assert_eq!(recent.start_time_ms, recent.end_time_ms);
    assert_eq!(tracker.current_session().await, Some(recent));
}

#[tokio::test]
async fn stop_without_open_session_changes_nothing() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let tracker = tracker_with(store.clone(), &clock).await;

    tracker.start_tracking().await.unwrap();
    clock.advance(60_000);
    tracker.stop_tracking().await.unwrap();
    tracker.acknowledge_navigation();

    let before_state = tracker.state();
    let before_sessions = store.snapshot();

    clock.advance(60_000);
    assert!(tracker.stop_tracking().await.unwrap().is_none());

    assert_eq!(tracker.state(), before_state);
    assert_eq!(store.snapshot(), before_sessions);
    assert!(tracker.pending_event().is_none());
}

#[derive(Clone, Copy, Debug)]
enum Op {
    Start,
    Stop,
    Clear,
}

#[tokio::test]
async fn start_and_stop_buttons_are_exclusive() {
    let sequences: &[&[Op]] = &[
        &[Op::Start, Op::Stop, Op::Start, Op::Stop],
        &[Op::Stop, Op::Stop, Op::Start, Op::Start, Op::Clear, Op::Stop],
        &[Op::Clear, Op::Start, Op::Clear, Op::Start, Op::Stop, Op::Clear],
        &[Op::Start, Op::Start, Op::Stop, Op::Clear, Op::Clear, Op::Start],
    ];

    for sequence in sequences {
        let store = MemoryStore::new();
        let clock = ManualClock::new(10);
        let tracker = tracker_with(store.clone(), &clock).await;
        let state = tracker.state();
        assert_eq!(state.start_visible, !state.stop_visible);

        for op in sequence.iter() {
            clock.advance(1_000);
            match op {
                Op::Start => tracker.start_tracking().await.unwrap(),
                Op::Stop => {
                    tracker.stop_tracking().await.unwrap();
                }
                Op::Clear => tracker.clear_history().await.unwrap(),
            }
            let state = tracker.state();
            assert_eq!(state.start_visible, !state.stop_visible, "after {op:?}");
            assert_eq!(state.clear_visible, !store.snapshot().is_empty());

            let open = store.snapshot().into_iter().filter(SleepSession::is_open).count();
            assert!(open <= 1, "two open sessions after {op:?}");
        }
    }
}

#[tokio::test]
async fn subscribers_see_published_state() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(5);
    let tracker = tracker_with(store, &clock).await;

    let mut rx = tracker.subscribe();
    assert!(rx.borrow_and_update().start_visible);

    tracker.start_tracking().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(rx.borrow().stop_visible);
}

#[tokio::test]
async fn reopened_tracker_resumes_open_session() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);

    let first = tracker_with(store.clone(), &clock).await;
    first.start_tracking().await.unwrap();
    first.close();

    let second = tracker_with(store.clone(), &clock).await;
    assert!(second.state().stop_visible);

    clock.set(400);
    let closed = second.stop_tracking().await.unwrap().unwrap();
    assert_eq!((closed.start_time_ms, closed.end_time_ms), (100, 400));
}

#[tokio::test]
async fn racing_starts_create_one_session() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;

    let stall = store.gate.write().await;
    let a = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.start_tracking().await }
    });
    let b = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.start_tracking().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(stall);

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
    assert_eq!(store.snapshot().len(), 1);
}

#[tokio::test]
async fn store_failure_leaves_state_untouched() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;
    tracker.start_tracking().await.unwrap();
    let before = tracker.state();

    store.fail_writes(true);
    clock.set(900);
    assert!(tracker.stop_tracking().await.is_err());
    assert!(tracker.clear_history().await.is_err());

    assert_eq!(tracker.state(), before);
    assert!(tracker.pending_event().is_none());
    assert!(store.snapshot()[0].is_open());

    store.fail_writes(false);
    assert!(tracker.stop_tracking().await.unwrap().is_some());
}

#[tokio::test]
async fn failed_start_write_changes_nothing() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;
    let before = tracker.state();

    store.fail_writes(true);
    assert!(tracker.start_tracking().await.is_err());

    assert_eq!(tracker.state(), before);
    assert!(tracker.current_session().await.is_none());
    assert!(store.snapshot().is_empty());
    assert!(tracker.pending_event().is_none());
}

#[tokio::test]
async fn start_keeps_inserted_session_when_reload_fails() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;

    store.fail_reads(true);
    assert!(tracker.start_tracking().await.is_err());

    let stored = store.snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(tracker.current_session().await, Some(stored[0].clone()));
    let state = tracker.state();
    assert!(state.stop_visible && !state.start_visible && state.clear_visible);

    // The open session gates a retry, reads failing or not.
    clock.advance(1_000);
    tracker.start_tracking().await.unwrap();
    store.fail_reads(false);
    tracker.start_tracking().await.unwrap();
    assert_eq!(store.snapshot().len(), 1);
}

#[tokio::test]
async fn stop_forgets_closed_session_when_reload_fails() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;
    tracker.start_tracking().await.unwrap();

    store.fail_reads(true);
    clock.set(700);
    assert!(tracker.stop_tracking().await.is_err());

    let stored = store.snapshot();
    assert_eq!(stored[0].end_time_ms, 700);
    assert!(tracker.current_session().await.is_none());
    assert!(tracker.state().start_visible);
    assert_eq!(
        tracker.pending_event(),
        Some(TrackerEvent::NavigateToRating(stored[0].clone()))
    );

    store.fail_reads(false);
    clock.set(900);
    assert!(tracker.stop_tracking().await.unwrap().is_none());
    assert_eq!(store.snapshot()[0].end_time_ms, 700);

    tracker.acknowledge_navigation();
    assert!(tracker.pending_event().is_none());
}

#[tokio::test]
async fn close_cancels_in_flight_start() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;
    let before = tracker.state();

    let stall = store.gate.write().await;
    let pending = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.start_tracking().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    tracker.close();
    let err = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(err.downcast_ref::<Cancelled>().is_some());
    drop(stall);

    assert_eq!(tracker.state(), before);
    assert!(tracker.current_session().await.is_none());
    assert!(store.snapshot().is_empty());
    assert!(tracker.pending_event().is_none());
}

#[tokio::test]
async fn close_cancels_in_flight_stop() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;
    tracker.start_tracking().await.unwrap();
    let before = tracker.state();

    let stall = store.gate.write().await;
    clock.set(500);
    let pending = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.stop_tracking().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    tracker.close();
    let err = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(err.downcast_ref::<Cancelled>().is_some());
    drop(stall);

    assert_eq!(tracker.state(), before);
    assert!(store.snapshot()[0].is_open());
    assert!(tracker.pending_event().is_none());
    assert!(tracker.next_event().await.is_none());
}

#[tokio::test]
async fn close_cancels_in_flight_operation() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store.clone(), &clock).await;

    let stall = store.gate.write().await;
    let pending = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.clear_history().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    tracker.close();
    let err = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(err.downcast_ref::<Cancelled>().is_some());
    drop(stall);

    assert!(tracker.pending_event().is_none());
    assert!(tracker.next_event().await.is_none());
}

#[tokio::test]
async fn next_event_waits_for_stop() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(100);
    let tracker = tracker_with(store, &clock).await;
    tracker.start_tracking().await.unwrap();

    let waiter = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.next_event().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    clock.set(250);
    let closed = tracker.stop_tracking().await.unwrap().unwrap();
    let event = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, Some(TrackerEvent::NavigateToRating(closed)));

    // Still pending until acknowledged.
    assert!(tracker.pending_event().is_some());
    tracker.acknowledge_navigation();
    assert!(tracker.pending_event().is_none());
}

#[tokio::test]
async fn dropping_last_handle_releases_store() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(1);
    let tracker = tracker_with(store.clone(), &clock).await;
    let rx = tracker.subscribe();
    drop(tracker);
    // Sender is gone along with the tracker.
    assert!(rx.has_changed().is_err());
    assert_eq!(Arc::strong_count(&store), 1);
}

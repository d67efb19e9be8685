//! Integration tests for signals, debouncing and deferred actions working together.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use horizon_mention_core::{Debouncer, DeferredQueue, Signal};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("horizon_mention_core=trace")
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Hide,
    Release,
}

#[test]
fn test_debounced_burst_emits_once() {
    init_tracing();
    let closed = Signal::<()>::new();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    closed.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let start = Instant::now();
    let mut resize = Debouncer::new(Duration::from_millis(10));
    for ms in [0, 2, 4, 6, 8] {
        let now = start + Duration::from_millis(ms);
        resize.call(now);
        if resize.poll(now) {
            closed.emit(());
        }
    }
    assert_eq!(count.load(Ordering::SeqCst), 0);

    for ms in [12, 18, 30, 40] {
        if resize.poll(start + Duration::from_millis(ms)) {
            closed.emit(());
        }
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(closed.emission_count(), 1);
}

#[test]
fn test_generation_supersedes_pending_actions() {
    init_tracing();
    let start = Instant::now();
    let mut queue = DeferredQueue::new();
    queue.post(start, Duration::ZERO, Action::Hide);
    queue.post(start, Duration::from_millis(5), Action::Release);
    assert_eq!(queue.pending_count(), 2);

    queue.advance_generation();
    queue.post(start, Duration::from_millis(5), Action::Hide);

    assert!(queue.take_due(start).is_empty());
    assert_eq!(queue.take_due(start + Duration::from_millis(5)), vec![Action::Hide]);
    assert!(!queue.has_pending());
}

#[test]
fn test_scoped_connection_ends_with_guard() {
    init_tracing();
    let active = Arc::new(Signal::<bool>::new());
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    {
        let _guard = active.connect_scoped(move |value: &bool| sink.lock().push(*value));
        active.emit(true);
    }
    active.emit(false);
    assert_eq!(*seen.lock(), vec![true]);
    assert_eq!(active.connection_count(), 0);
}

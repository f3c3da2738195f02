//! Integration test: invoker composing retry, measurement and the client pool
//! around the in-memory provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use calguard_core::batch::BatchOptions;
use calguard_core::calendar::{CalendarEvent, InMemoryProvider, Invoker, Operation, ProviderFactory};
use calguard_core::perf::PerformanceRecorder;
use calguard_core::pool::ResourcePool;
use calguard_core::retry::RetryPolicy;
use calguard_core::{CalendarError, FailureKind};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO, 2.0, 0.0)
}

/// Factory handing out one shared provider and counting constructions.
fn counting_factory(
    provider: Arc<InMemoryProvider>,
    builds: Arc<AtomicUsize>,
) -> ProviderFactory<InMemoryProvider> {
    Arc::new(move || {
        builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&provider))
    })
}

fn event(n: usize) -> CalendarEvent {
    CalendarEvent::new(
        format!("Meeting {n}"),
        format!("2024-05-0{n}T10:00:00"),
        format!("2024-05-0{n}T11:00:00"),
    )
}

fn invoker(provider: &Arc<InMemoryProvider>, builds: &Arc<AtomicUsize>) -> Invoker<InMemoryProvider> {
    Invoker::new(
        "calendar:primary",
        counting_factory(Arc::clone(provider), Arc::clone(builds)),
    )
    .with_policy(fast_policy(3))
    .with_batch_options(BatchOptions::new(2, Duration::ZERO))
}

#[test]
fn transient_failures_are_retried_and_each_attempt_measured() {
    let provider = Arc::new(InMemoryProvider::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let invoker = invoker(&provider, &builds);

    provider.fail_next(Operation::CreateEvent, FailureKind::TransientNetwork, 2);
    let created = invoker.create_event(&event(1)).unwrap();
    assert!(created.id.is_some());
    assert_eq!(provider.calls(Operation::CreateEvent), 3);

    let stats = invoker.recorder().record("create_event");
    assert_eq!(stats.call_count, 3);
    assert!((stats.success_rate - 1.0 / 3.0).abs() < 1e-9);

    // One client construction serves every attempt.
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(invoker.pool().stats().keys, vec!["calendar:primary".to_string()]);
}

#[test]
fn non_retryable_failure_surfaces_with_category() {
    let provider = Arc::new(InMemoryProvider::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let invoker = invoker(&provider, &builds);

    let err = invoker.update_event("evt-missing", &event(2)).unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
    assert_eq!(provider.calls(Operation::UpdateEvent), 1);
    assert_eq!(invoker.recorder().record("update_event").success_rate, 0.0);
}

#[test]
fn exhausted_retries_return_last_failure() {
    let provider = Arc::new(InMemoryProvider::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let invoker = invoker(&provider, &builds);

    provider.fail_next(Operation::ListEvents, FailureKind::QuotaExceeded, 5);
    let err = invoker.list_events("2024-05-01", "2024-05-31").unwrap_err();
    assert_eq!(err.kind, FailureKind::QuotaExceeded);
    assert_eq!(provider.calls(Operation::ListEvents), 3);
}

#[test]
fn factory_failure_is_retried_and_nothing_is_pooled() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let factory: ProviderFactory<InMemoryProvider> = {
        let attempts = Arc::clone(&attempts);
        Arc::new(move || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(CalendarError::network("auth endpoint unreachable"))
        })
    };
    let invoker = Invoker::new("calendar:broken", factory).with_policy(fast_policy(2));

    let err = invoker.get_event("evt-1").unwrap_err();
    assert_eq!(err.kind, FailureKind::TransientNetwork);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(invoker.pool().is_empty());
}

#[test]
fn batch_keeps_positions_and_survives_failures() {
    let provider = Arc::new(InMemoryProvider::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let invoker = invoker(&provider, &builds).with_policy(fast_policy(1));

    let mut events: Vec<CalendarEvent> = (1..=5).map(event).collect();
    events[2].summary.clear();
    let created = invoker.create_events_batch(&events);
    assert_eq!(created.len(), 5);
    assert!(created[2].is_none());
    assert!(created
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .all(|(_, c)| c.is_some()));

    let mut ids: Vec<String> = created
        .iter()
        .flatten()
        .filter_map(|e| e.id.clone())
        .collect();
    ids.push("evt-missing".to_string());

    let fetched = invoker.get_events_batch(&ids);
    assert_eq!(fetched.iter().filter(|e| e.is_some()).count(), 4);
    assert!(fetched[4].is_none());

    let deleted = invoker.delete_events_batch(&ids);
    assert_eq!(deleted, vec![true, true, true, true, false]);
    assert!(provider.is_empty());
}

#[test]
fn invokers_share_pool_and_recorder() {
    let pool = Arc::new(ResourcePool::new(
        1,
        Duration::from_secs(300),
        Duration::from_secs(1800),
    ));
    let recorder = Arc::new(PerformanceRecorder::new());
    let work = Arc::new(InMemoryProvider::new());
    let home = Arc::new(InMemoryProvider::new());
    let builds = Arc::new(AtomicUsize::new(0));

    let a = Invoker::new("calendar:work", counting_factory(Arc::clone(&work), Arc::clone(&builds)))
        .with_pool(Arc::clone(&pool))
        .with_recorder(Arc::clone(&recorder));
    let b = Invoker::new("calendar:home", counting_factory(Arc::clone(&home), Arc::clone(&builds)))
        .with_pool(Arc::clone(&pool))
        .with_recorder(Arc::clone(&recorder));

    a.create_event(&event(1)).unwrap();
    b.create_event(&event(2)).unwrap();
    // Capacity 1: home evicted work, so work is rebuilt.
    a.get_event("evt-1").unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 3);
    assert_eq!(pool.stats().keys, vec!["calendar:work".to_string()]);
    assert_eq!(recorder.record("create_event").call_count, 2);
    assert_eq!(work.len(), 1);
    assert_eq!(home.len(), 1);
}

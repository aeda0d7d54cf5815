//! End-to-end tests for batch execution.
//!
//! These tests exercise the full path a caller takes: build a permit pool,
//! wrap work in tasks, run the batch, then inspect results, errors, timing,
//! and emitted notifications.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use corral::{
    format_event, BatchExecutor, Event, EventBus, EventHandler, PermitPool, Task, TaskStatus,
    WorkError,
};

/// Handler that records every event it receives, for asserting on
/// notification output.
struct RecordingHandler {
    events: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }
}

/// Tracks how many tasks are between permit-acquire and release at once.
struct ConcurrencyProbe {
    active: AtomicUsize,
    max_seen: AtomicUsize,
}

impl ConcurrencyProbe {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        })
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn max_seen(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn concurrency_never_exceeds_pool_capacity() {
    let pool = Arc::new(PermitPool::new(2).unwrap());
    let probe = ConcurrencyProbe::new();

    let tasks: Vec<Task<()>> = (0..8)
        .map(|_| {
            let probe = probe.clone();
            Task::new(
                move || {
                    probe.enter();
                    std::thread::sleep(Duration::from_millis(30));
                    probe.exit();
                    Ok(())
                },
                false,
                pool.clone(),
            )
        })
        .collect();

    let finished = BatchExecutor::new().execute(tasks, &pool).await.unwrap();

    assert_eq!(finished.len(), 8);
    assert!(finished.iter().all(|t| t.status().is_finished()));
    assert!(
        probe.max_seen() <= 2,
        "observed {} tasks holding permits at once with capacity 2",
        probe.max_seen()
    );
}

#[tokio::test]
async fn six_visible_tasks_with_one_permit_run_serially() {
    let pool = Arc::new(PermitPool::new(1).unwrap());
    let handler = Arc::new(RecordingHandler::new());
    let executor = BatchExecutor::with_bus(Arc::new(EventBus::with_handler(handler.clone())));
    let probe = ConcurrencyProbe::new();

    let tasks: Vec<Task<usize>> = (0..6)
        .map(|marker| {
            let probe = probe.clone();
            Task::new(
                move || {
                    probe.enter();
                    std::thread::sleep(Duration::from_millis(5));
                    probe.exit();
                    Ok(marker)
                },
                true,
                pool.clone(),
            )
        })
        .collect();

    let finished = executor.execute(tasks, &pool).await.unwrap();

    // Each task returns its own marker, in submission order.
    let markers: Vec<usize> = finished.iter().map(|t| *t.result().unwrap()).collect();
    assert_eq!(markers, vec![0, 1, 2, 3, 4, 5]);

    // One permit means strictly serial execution.
    assert_eq!(probe.max_seen(), 1);

    // Exactly 6 finished notifications came out.
    let events = handler.events().await;
    let finished_lines: Vec<String> = events
        .iter()
        .map(format_event)
        .filter(|line| line.starts_with("finished:"))
        .collect();
    assert_eq!(finished_lines.len(), 6);
}

#[tokio::test]
async fn all_failing_tasks_complete_without_leaking_permits() {
    let pool = Arc::new(PermitPool::new(1).unwrap());

    let tasks: Vec<Task<()>> = (0..6)
        .map(|_| {
            Task::new(
                || Err(WorkError::failed("migration batch rejected")),
                true,
                pool.clone(),
            )
        })
        .collect();

    let finished = BatchExecutor::new().execute(tasks, &pool).await.unwrap();

    // None hung waiting on a leaked permit, and the pool is whole again.
    assert_eq!(finished.len(), 6);
    assert_eq!(pool.available(), 1);

    // Caller-side aggregation sees the message once per task.
    let messages: Vec<String> = finished
        .iter()
        .filter_map(|t| t.error().map(|e| e.to_string()))
        .collect();
    assert_eq!(messages.len(), 6);
    assert!(messages.iter().all(|m| m == "migration batch rejected"));
}

#[tokio::test]
async fn panic_message_is_retrievable_after_the_batch() {
    let pool = Arc::new(PermitPool::new(2).unwrap());
    let tasks: Vec<Task<()>> = vec![Task::new(
        || panic!("test_function() takes exactly 1 argument (0 given)"),
        true,
        pool.clone(),
    )
    .with_name("arity_check")];

    let finished = BatchExecutor::new().execute(tasks, &pool).await.unwrap();

    assert_eq!(finished[0].status(), TaskStatus::Finished);
    let err = finished[0].error().unwrap();
    assert!(err
        .to_string()
        .contains("test_function() takes exactly 1 argument (0 given)"));
}

#[tokio::test]
async fn empty_batch_finishes_immediately() {
    let pool = Arc::new(PermitPool::new(4).unwrap());

    let finished: Vec<Task<()>> = BatchExecutor::new()
        .execute(Vec::new(), &pool)
        .await
        .unwrap();

    assert!(finished.is_empty());
    assert_eq!(pool.available(), 4);
}

#[tokio::test]
async fn every_finished_task_has_consistent_timing() {
    let pool = Arc::new(PermitPool::new(3).unwrap());
    let tasks: Vec<Task<()>> = (0..5)
        .map(|i| {
            Task::new(
                move || {
                    std::thread::sleep(Duration::from_millis(2 * i as u64));
                    Ok(())
                },
                false,
                pool.clone(),
            )
        })
        .collect();

    let finished = BatchExecutor::new().execute(tasks, &pool).await.unwrap();

    for task in &finished {
        let start = task.start_time().unwrap();
        let finish = task.finish_time().unwrap();
        assert!(finish >= start);
        assert_eq!(task.duration().unwrap(), finish - start);
    }
}

#[tokio::test]
async fn caller_builds_its_own_aggregate_report() {
    let pool = Arc::new(PermitPool::new(2).unwrap());
    let tasks: Vec<Task<&'static str>> = vec![
        Task::new(|| Ok("backend ok"), false, pool.clone()).with_name("check_backend"),
        Task::new(
            || Err(WorkError::failed("3 style violations")),
            false,
            pool.clone(),
        )
        .with_name("check_style"),
        Task::new(|| Ok("frontend ok"), false, pool.clone()).with_name("check_frontend"),
        Task::new(
            || Err(WorkError::failed("broken import")),
            false,
            pool.clone(),
        )
        .with_name("check_imports"),
    ];

    let finished = BatchExecutor::new().execute(tasks, &pool).await.unwrap();

    // The executor does no aggregation; this is the caller's half of the
    // contract, e.g. how a lint runner would summarize a batch.
    let succeeded = finished.iter().filter(|t| t.result().is_some()).count();
    let failing: Vec<(&str, String)> = finished
        .iter()
        .filter_map(|t| t.error().map(|e| (t.name().as_str(), e.to_string())))
        .collect();

    assert_eq!(succeeded, 2);
    assert_eq!(
        failing,
        vec![
            ("check_style", "3 style violations".to_string()),
            ("check_imports", "broken import".to_string()),
        ]
    );
}

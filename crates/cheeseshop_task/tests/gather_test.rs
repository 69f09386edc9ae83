use cheeseshop_error::{CheeseshopError, CheeseshopErrorKind, CheeseshopResult, HttpError};
use cheeseshop_task::strict_gather;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

type Task = Pin<Box<dyn Future<Output = CheeseshopResult<u32>> + Send>>;

fn task<F>(future: F) -> Task
where
    F: Future<Output = CheeseshopResult<u32>> + Send + 'static,
{
    Box::pin(future)
}

#[tokio::test]
async fn results_keep_input_order() {
    let tasks: Vec<Task> = vec![
        task(async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(1)
        }),
        task(async { Ok(2) }),
        task(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(3)
        }),
    ];

    let results = strict_gather(tasks).await.unwrap();
    assert_eq!(results, vec![1, 2, 3]);
}

#[tokio::test]
async fn empty_input_gathers_nothing() {
    let tasks: Vec<Task> = Vec::new();
    assert!(strict_gather(tasks).await.unwrap().is_empty());
}

#[tokio::test]
async fn first_failure_cancels_and_settles_siblings() {
    let settled = Arc::new(AtomicUsize::new(0));
    let mut tasks: Vec<Task> = Vec::new();

    for _ in 0..5 {
        let guard = DropCounter(settled.clone());
        tasks.push(task(async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        }));
    }
    tasks.push(task(async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Err(HttpError::new("upstream reset").into())
    }));

    let err = strict_gather(tasks).await.unwrap_err();

    assert!(matches!(err.kind(), CheeseshopErrorKind::Http(_)));
    // Every sibling was dropped before the error came back.
    assert_eq!(settled.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn panic_surfaces_as_task_error() {
    let tasks: Vec<Task> = vec![
        task(async { Ok(1) }),
        task(async {
            if true {
                panic!("backend exploded");
            }
            Ok(2)
        }),
    ];

    let err: CheeseshopError = strict_gather(tasks).await.unwrap_err();
    match err.kind() {
        CheeseshopErrorKind::Task(task) => assert!(task.message.contains("panicked")),
        other => panic!("expected task error, got {other}"),
    }
}

async fn settles(counter: &AtomicUsize, expected: usize) -> bool {
    for _ in 0..100 {
        if counter.load(Ordering::SeqCst) == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn caller_timeout_cancels_sleeping_task() {
    let settled = Arc::new(AtomicUsize::new(0));
    let guard = DropCounter(settled.clone());
    let tasks: Vec<Task> = vec![
        task(async { Ok(1) }),
        task(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
            Ok(2)
        }),
    ];

    let outcome = tokio::time::timeout(Duration::from_millis(50), strict_gather(tasks)).await;

    assert!(outcome.is_err());
    assert!(settles(&settled, 1).await, "sleeping task outlived its gather");
}

#[tokio::test]
async fn dropping_a_polled_gather_cancels_its_tasks() {
    let settled = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<Task> = (0..3)
        .map(|_| {
            let guard = DropCounter(settled.clone());
            let started = started.clone();
            task(async move {
                let _guard = guard;
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(0)
            })
        })
        .collect();

    let mut gather = Box::pin(strict_gather(tasks));
    tokio::select! {
        _ = &mut gather => panic!("gather finished early"),
        _ = tokio::time::sleep(Duration::from_millis(20)) => {}
    }
    assert!(settles(&started, 3).await);
    drop(gather);

    assert!(settles(&settled, 3).await, "tasks outlived the dropped gather");
}

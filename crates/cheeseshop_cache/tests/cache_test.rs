use cheeseshop_cache::{
    AsyncCache, CacheConfig, CacheConfigBuilder, CacheKey, CachePolicy, HOUR, MINUTE, Memoized,
    Persistence,
};
use cheeseshop_error::{CheeseshopResult, HttpError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn counting(counter: &Arc<AtomicUsize>, value: u32) -> impl Future<Output = CheeseshopResult<u32>> + use<> {
    let counter = counter.clone();
    async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }
}

fn file_cache(dir: &TempDir) -> AsyncCache {
    AsyncCache::new(
        CacheConfigBuilder::default()
            .directory(Some(dir.path().to_path_buf()))
            .build()
            .unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn hit_until_timeout_then_recompute() {
    let cache = AsyncCache::new(CacheConfig::default());
    let policy = CachePolicy::new("releases", MINUTE);
    let calls = Arc::new(AtomicUsize::new(0));

    let first = cache
        .get_or_compute(&policy, "requests", || counting(&calls, 1))
        .await
        .unwrap();
    let second = cache
        .get_or_compute(&policy, "requests", || counting(&calls, 2))
        .await
        .unwrap();
    assert_eq!((first, second), (1, 1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(MINUTE + Duration::from_secs(1)).await;

    let third = cache
        .get_or_compute(&policy, "requests", || counting(&calls, 3))
        .await
        .unwrap();
    assert_eq!(third, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn eviction_task_drops_expired_entries() {
    let cache = AsyncCache::new(CacheConfig::default());
    let policy = CachePolicy::new("packages", MINUTE);
    let calls = Arc::new(AtomicUsize::new(0));

    cache
        .get_or_compute(&policy, &(), || counting(&calls, 7))
        .await
        .unwrap();
    assert_eq!(cache.len(), 1);

    tokio::time::sleep(MINUTE + Duration::from_secs(1)).await;
    assert!(cache.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_timeout_entries_leave_nothing_scheduled() {
    let cache = AsyncCache::new(CacheConfig::default());
    let policy = CachePolicy::new("instant", Duration::ZERO);
    let calls = Arc::new(AtomicUsize::new(0));

    for round in 0..50u32 {
        let value = cache
            .get_or_compute(&policy, &round, || counting(&calls, round))
            .await
            .unwrap();
        assert_eq!(value, round);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 50);

    for _ in 0..100 {
        if cache.is_empty() && cache.pending_evictions() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(cache.is_empty());
    assert_eq!(cache.pending_evictions(), 0);
}

#[tokio::test]
async fn concurrent_callers_share_one_computation() {
    let cache = AsyncCache::new(CacheConfig::default());
    let policy = CachePolicy::new("release_data", HOUR);
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let (cache, policy, calls) = (cache.clone(), policy.clone(), calls.clone());
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute(&policy, &("django", "5.0"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(String::from("payload"))
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "payload");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_arguments_do_not_share() {
    let cache = AsyncCache::new(CacheConfig::default());
    let policy = CachePolicy::new("releases", HOUR);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.get_or_compute(&policy, "a", || counting(&calls, 1)).await.unwrap();
    cache.get_or_compute(&policy, "b", || counting(&calls, 2)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn errors_are_not_cached() {
    let cache = AsyncCache::new(CacheConfig::default());
    let policy = CachePolicy::new("packages", HOUR);

    let failed: CheeseshopResult<u32> = cache
        .get_or_compute(&policy, &(), || async { Err(HttpError::new("reset").into()) })
        .await;
    assert!(failed.is_err());
    assert!(cache.is_empty());

    let calls = Arc::new(AtomicUsize::new(0));
    let value = cache
        .get_or_compute(&policy, &(), || counting(&calls, 5))
        .await
        .unwrap();
    assert_eq!(value, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn skip_empty_returns_without_caching() {
    let cache = AsyncCache::new(CacheConfig::default());
    let policy = CachePolicy::new("search", HOUR).with_skip_empty(true);
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let counter = calls.clone();
        let hits: Vec<String> = cache
            .get_or_compute(&policy, "nothing", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            })
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn disabled_cache_always_computes() {
    let config = CacheConfigBuilder::default().enabled(false).build().unwrap();
    let cache = AsyncCache::new(config);
    let policy = CachePolicy::new("releases", HOUR);
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        cache.get_or_compute(&policy, &(), || counting(&calls, 1)).await.unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn file_entries_survive_a_new_cache() {
    let dir = TempDir::new().unwrap();
    let policy = CachePolicy::new("packages", HOUR).with_persistence(Persistence::File);
    let calls = Arc::new(AtomicUsize::new(0));

    file_cache(&dir)
        .get_or_compute(&policy, &(), || counting(&calls, 11))
        .await
        .unwrap();

    let key = CacheKey::derive(&policy, &()).unwrap();
    assert!(dir.path().join(key.digest()).is_file());

    let restored: u32 = file_cache(&dir)
        .get_or_compute(&policy, &(), || counting(&calls, 99))
        .await
        .unwrap();
    assert_eq!(restored, 11);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_files_are_removed_on_read() {
    let dir = TempDir::new().unwrap();
    let policy = CachePolicy::new("packages", HOUR).with_persistence(Persistence::File);
    let key = CacheKey::derive(&policy, &()).unwrap();
    let path = dir.path().join(key.digest());
    std::fs::write(
        &path,
        r#"{"function": "packages", "created_at": 0, "value": 1}"#,
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let value = file_cache(&dir)
        .get_or_compute(&policy, &(), || counting(&calls, 2))
        .await
        .unwrap();

    assert_eq!(value, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Rewritten with a fresh timestamp.
    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["value"], 2);
    assert!(raw["created_at"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn invalidate_only_touches_one_function() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    let releases = CachePolicy::new("releases", HOUR).with_persistence(Persistence::File);
    let search = CachePolicy::new("search", HOUR).with_persistence(Persistence::File);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.get_or_compute(&releases, "a", || counting(&calls, 1)).await.unwrap();
    cache.get_or_compute(&releases, "b", || counting(&calls, 2)).await.unwrap();
    cache.get_or_compute(&search, "a", || counting(&calls, 3)).await.unwrap();

    let removed = cache.invalidate("releases").await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(cache.len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    cache.get_or_compute(&releases, "a", || counting(&calls, 4)).await.unwrap();
    cache.get_or_compute(&search, "a", || counting(&calls, 5)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn invalidate_all_clears_memory_and_files() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    let policy = CachePolicy::new("release_data", HOUR).with_persistence(Persistence::File);
    let calls = Arc::new(AtomicUsize::new(0));

    for name in ["a", "b", "c"] {
        cache.get_or_compute(&policy, name, || counting(&calls, 1)).await.unwrap();
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);

    cache.invalidate_all().await.unwrap();

    assert!(cache.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn memoized_function_caches_by_argument() {
    let cache = AsyncCache::new(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let length = Memoized::new(cache, CachePolicy::new("length", HOUR), move |name: String| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(name.len())
        }
    });

    assert_eq!(length.call("numpy".into()).await.unwrap(), 5);
    assert_eq!(length.call("numpy".into()).await.unwrap(), 5);
    assert_eq!(length.call("scipy-stack".into()).await.unwrap(), 11);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    length.invalidate().await.unwrap();
    assert_eq!(length.call("numpy".into()).await.unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[cfg(unix)]
#[tokio::test]
async fn sigusr1_invalidates_everything() {
    let cache = AsyncCache::new(CacheConfig::default());
    let policy = CachePolicy::new("packages", HOUR);
    let calls = Arc::new(AtomicUsize::new(0));
    cache.get_or_compute(&policy, &(), || counting(&calls, 1)).await.unwrap();

    let handler = cheeseshop_cache::spawn_signal_invalidation(cache.clone()).unwrap();
    let status = std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("kill -USR1 {}", std::process::id()))
        .status()
        .unwrap();
    assert!(status.success());

    for _ in 0..100 {
        if cache.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(cache.is_empty());
    handler.abort();
}

//! Single-flight cache service.

use crate::entry::{CacheFile, is_falsy};
use crate::{CacheConfig, CacheEntry, CacheKey, CachePolicy, Persistence};
use cheeseshop_error::{CacheError, CheeseshopResult, JsonError, TaskError};
use cheeseshop_task::KeyedLocks;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

struct Inner {
    config: CacheConfig,
    entries: DashMap<CacheKey, CacheEntry>,
    locks: KeyedLocks<CacheKey>,
    evictions: DashMap<CacheKey, (u64, JoinHandle<()>)>,
    eviction_seq: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for entry in self.evictions.iter() {
            entry.value().1.abort();
        }
    }
}

/// Shared cache of upstream lookups.
///
/// Cloning is cheap; clones share state. At most one computation per key
/// runs at a time; callers arriving meanwhile wait for it and then read its
/// result. Must be used inside a tokio runtime.
///
/// # Example
///
/// ```
/// use cheeseshop_cache::{AsyncCache, CacheConfig, CachePolicy, MINUTE};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cheeseshop_error::CheeseshopResult<()> {
/// let cache = AsyncCache::new(CacheConfig::default());
/// let policy = CachePolicy::new("answer", MINUTE);
///
/// let first: u32 = cache.get_or_compute(&policy, &(), || async { Ok(42) }).await?;
/// let second: u32 = cache.get_or_compute(&policy, &(), || async { Ok(0) }).await?;
/// assert_eq!((first, second), (42, 42));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AsyncCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AsyncCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncCache")
            .field("config", &self.inner.config)
            .field("entries", &self.inner.entries.len())
            .finish()
    }
}

impl AsyncCache {
    /// Create a cache service.
    pub fn new(config: CacheConfig) -> Self {
        tracing::debug!(
            enabled = config.enabled(),
            directory = ?config.directory(),
            "Creating new AsyncCache"
        );
        Self {
            inner: Arc::new(Inner {
                config,
                entries: DashMap::new(),
                locks: KeyedLocks::new(),
                evictions: DashMap::new(),
                eviction_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Number of entries held in memory.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// True when nothing is held in memory.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Number of scheduled evictions that have not run yet.
    pub fn pending_evictions(&self) -> usize {
        self.inner.evictions.len()
    }

    /// Return the cached result for `args`, or run `compute` and cache it.
    ///
    /// Errors from `compute` are returned and nothing is cached.
    pub async fn get_or_compute<A, T, F, Fut>(
        &self,
        policy: &CachePolicy,
        args: &A,
        compute: F,
    ) -> CheeseshopResult<T>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CheeseshopResult<T>>,
    {
        if !self.inner.config.enabled() {
            return compute().await;
        }
        let key = CacheKey::derive(policy, args)?;
        self.get_or_compute_keyed(policy, key, compute).await
    }

    /// [`AsyncCache::get_or_compute`] with a precomputed key.
    #[tracing::instrument(skip(self, policy, key, compute), fields(function = %policy.id(), digest = %key.digest()))]
    pub async fn get_or_compute_keyed<T, F, Fut>(
        &self,
        policy: &CachePolicy,
        key: CacheKey,
        compute: F,
    ) -> CheeseshopResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CheeseshopResult<T>>,
    {
        if !self.inner.config.enabled() {
            return compute().await;
        }

        if let Some(value) = self.lookup(policy, &key).await {
            tracing::debug!("Cache HIT");
            return decode(value);
        }

        let _guard = self.inner.locks.lock(key.clone()).await;

        if let Some(value) = self.lookup(policy, &key).await {
            tracing::debug!("Cache HIT after wait");
            return decode(value);
        }

        tracing::debug!("Cache MISS");
        let result = compute().await?;
        let value = serde_json::to_value(&result).map_err(|e| JsonError::new(e.to_string()))?;

        if *policy.skip_empty() && is_falsy(&value) {
            tracing::debug!("Empty result, not caching");
            return Ok(result);
        }

        self.store(policy, key, value).await;
        Ok(result)
    }

    async fn lookup(&self, policy: &CachePolicy, key: &CacheKey) -> Option<JsonValue> {
        if let Some(entry) = self.inner.entries.get(key) {
            if !entry.is_expired() {
                return Some(entry.value().value().clone());
            }
        }
        if self
            .inner
            .entries
            .remove_if(key, |_, entry| entry.is_expired())
            .is_some()
        {
            tracing::debug!("Cache EXPIRED");
        }

        if *policy.persistence() != Persistence::File {
            return None;
        }
        let path = self.file_path(key)?;
        let (value, remaining) = self.read_file(&path, *policy.timeout()).await?;

        self.inner
            .entries
            .insert(key.clone(), CacheEntry::new(value.clone(), remaining));
        self.schedule_eviction(key.clone(), remaining);
        Some(value)
    }

    async fn store(&self, policy: &CachePolicy, key: CacheKey, value: JsonValue) {
        let timeout = *policy.timeout();

        if *policy.persistence() == Persistence::File {
            if let Some(path) = self.file_path(&key) {
                let file = CacheFile {
                    function: key.function().clone(),
                    created_at: unix_now(),
                    value: value.clone(),
                };
                if let Err(err) = write_file(&path, &file).await {
                    tracing::error!(error = %err, path = %path.display(), "Failed to persist cache entry");
                }
            }
        }

        self.inner
            .entries
            .insert(key.clone(), CacheEntry::new(value, timeout));
        self.schedule_eviction(key, timeout);
    }

    fn schedule_eviction(&self, key: CacheKey, after: Duration) {
        if let Some((_, (_, previous))) = self.inner.evictions.remove(&key) {
            previous.abort();
        }

        let seq = self.inner.eviction_seq.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task_key = key.clone();

        // The task only runs once its handle is registered, so its cleanup
        // always finds the slot it has to clear.
        let (armed, registered) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            if registered.await.is_err() {
                return;
            }
            tokio::time::sleep(after).await;
            if let Some(inner) = weak.upgrade() {
                inner
                    .entries
                    .remove_if(&task_key, |_, entry| entry.is_expired());
                inner
                    .evictions
                    .remove_if(&task_key, |_, (current, _)| *current == seq);
            }
        });
        self.inner.evictions.insert(key, (seq, handle));
        let _ = armed.send(());
    }

    fn file_path(&self, key: &CacheKey) -> Option<PathBuf> {
        self.inner
            .config
            .directory()
            .as_ref()
            .map(|dir| dir.join(key.digest()))
    }

    async fn read_file(&self, path: &Path, timeout: Duration) -> Option<(JsonValue, Duration)> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Unreadable cache file");
                return None;
            }
        };

        let file: CacheFile = match serde_json::from_slice(&raw) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Corrupt cache file, removing");
                remove_file(path).await;
                return None;
            }
        };

        let age = Duration::from_secs(unix_now().saturating_sub(file.created_at));
        match timeout.checked_sub(age).filter(|remaining| !remaining.is_zero()) {
            Some(remaining) => Some((file.value, remaining)),
            None => {
                tracing::debug!(path = %path.display(), "Stale cache file, removing");
                remove_file(path).await;
                None
            }
        }
    }

    /// Drop every entry of one function, in memory and on disk.
    ///
    /// Returns how many entries were removed.
    #[tracing::instrument(skip(self))]
    pub async fn invalidate(&self, function: &str) -> CheeseshopResult<usize> {
        let stale: Vec<CacheKey> = self
            .inner
            .entries
            .iter()
            .filter(|entry| entry.key().function() == function)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in stale {
            if self.inner.entries.remove(&key).is_some() {
                removed += 1;
            }
            if let Some((_, (_, handle))) = self.inner.evictions.remove(&key) {
                handle.abort();
            }
        }

        if let Some(dir) = self.inner.config.directory().clone() {
            let function = function.to_string();
            let files = tokio::task::spawn_blocking(move || purge_directory(&dir, Some(&function)))
                .await
                .map_err(|e| TaskError::new(e.to_string()))??;
            removed = removed.max(files);
        }

        tracing::warn!(removed, "Invalidated cached function");
        Ok(removed)
    }

    /// Drop everything: memory entries, pending evictions, locks and files.
    #[tracing::instrument(skip(self))]
    pub async fn invalidate_all(&self) -> CheeseshopResult<()> {
        let cleared = self.inner.entries.len();
        self.inner.entries.clear();
        self.inner.locks.clear();
        for entry in self.inner.evictions.iter() {
            entry.value().1.abort();
        }
        self.inner.evictions.clear();

        let mut files = 0;
        if let Some(dir) = self.inner.config.directory().clone() {
            files = tokio::task::spawn_blocking(move || purge_directory(&dir, None))
                .await
                .map_err(|e| TaskError::new(e.to_string()))??;
        }

        tracing::warn!(cleared, files, "Invalidated all caches");
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(value: JsonValue) -> CheeseshopResult<T> {
    serde_json::from_value(value).map_err(|e| JsonError::new(e.to_string()).into())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

async fn write_file(path: &Path, file: &CacheFile) -> CheeseshopResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::new(format!("{}: {}", parent.display(), e)))?;
    }

    let bytes = serde_json::to_vec(file).map_err(|e| JsonError::new(e.to_string()))?;
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, bytes)
        .await
        .map_err(|e| CacheError::new(format!("{}: {}", temp_path.display(), e)))?;
    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        CacheError::new(format!(
            "rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))
    })?;
    Ok(())
}

async fn remove_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(error = %e, path = %path.display(), "Failed to remove cache file");
    }
}

/// Delete cache files, all of them or only those of `function`.
fn purge_directory(dir: &Path, function: Option<&str>) -> CheeseshopResult<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(CacheError::new(format!("{}: {}", dir.display(), e)).into()),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(function) = function {
            let matches = std::fs::read(&path)
                .ok()
                .and_then(|raw| serde_json::from_slice::<CacheFile>(&raw).ok())
                .is_some_and(|file| file.function == function);
            if !matches {
                continue;
            }
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(error = %e, path = %path.display(), "Failed to remove cache file"),
        }
    }
    Ok(removed)
}

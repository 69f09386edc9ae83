//! Per-key async mutexes.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A map of lazily created async mutexes, one per key.
///
/// Entries are removed again when the last holder or waiter lets go, so the
/// map only grows with the number of keys currently contended.
///
/// # Examples
///
/// ```
/// use cheeseshop_task::KeyedLocks;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let locks = KeyedLocks::new();
/// {
///     let _guard = locks.lock("sample.tar.gz".to_string()).await;
///     assert_eq!(locks.len(), 1);
/// }
/// assert!(locks.is_empty());
/// # }
/// ```
#[derive(Debug)]
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> KeyedLockGuard<'_, K> {
        let mutex = Arc::clone(
            &self
                .locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        let guard = mutex.lock_owned().await;
        KeyedLockGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of keys currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True when no key is locked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Forget every mutex. Current holders keep their guards.
    pub fn clear(&self) {
        self.locks.clear();
    }
}

/// Exclusive access to one key of a [`KeyedLocks`].
pub struct KeyedLockGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    locks: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyedLockGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

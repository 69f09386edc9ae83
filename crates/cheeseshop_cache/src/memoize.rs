//! Typed memoized functions.

use crate::{AsyncCache, CacheKey, CachePolicy};
use cheeseshop_error::CheeseshopResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;

/// An async function `A -> T` whose results go through an [`AsyncCache`].
///
/// # Examples
///
/// ```
/// use cheeseshop_cache::{AsyncCache, CacheConfig, CachePolicy, Memoized, HOUR};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cheeseshop_error::CheeseshopResult<()> {
/// let cache = AsyncCache::new(CacheConfig::default());
/// let shout = Memoized::new(cache, CachePolicy::new("shout", HOUR), |name: String| async move {
///     Ok(name.to_uppercase())
/// });
/// assert_eq!(shout.call("pip".to_string()).await?, "PIP");
/// # Ok(())
/// # }
/// ```
pub struct Memoized<A, T, F> {
    cache: AsyncCache,
    policy: CachePolicy,
    func: F,
    _marker: PhantomData<fn(A) -> T>,
}

impl<A, T, F, Fut> Memoized<A, T, F>
where
    A: Serialize,
    T: Serialize + DeserializeOwned,
    F: Fn(A) -> Fut,
    Fut: Future<Output = CheeseshopResult<T>>,
{
    /// Wrap `func` with `policy`.
    pub fn new(cache: AsyncCache, policy: CachePolicy, func: F) -> Self {
        Self {
            cache,
            policy,
            func,
            _marker: PhantomData,
        }
    }

    /// Policy in use.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Call through the cache.
    pub async fn call(&self, args: A) -> CheeseshopResult<T> {
        if !self.cache.config().enabled() {
            return (self.func)(args).await;
        }
        let key = CacheKey::derive(&self.policy, &args)?;
        self.cache
            .get_or_compute_keyed(&self.policy, key, || (self.func)(args))
            .await
    }

    /// Forget every cached result of this function.
    pub async fn invalidate(&self) -> CheeseshopResult<usize> {
        self.cache.invalidate(self.policy.id()).await
    }
}

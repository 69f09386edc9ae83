//! Async single-flight TTL cache for upstream index lookups.
//!
//! Results are keyed by a digest of the cached function's identity and its
//! serialized arguments. Concurrent callers with the same key share one
//! computation; entries expire after the policy's timeout and can optionally
//! be persisted as JSON files so they survive restarts.

#![warn(missing_docs)]

mod cache;
mod config;
mod entry;
mod memoize;
mod policy;
#[cfg(unix)]
mod signal;

pub use cache::AsyncCache;
pub use config::{CacheConfig, CacheConfigBuilder, TtlConfig, TtlConfigBuilder};
pub use entry::{CacheEntry, CacheKey};
pub use memoize::Memoized;
pub use policy::{CachePolicy, DAY, HOUR, MINUTE, MONTH, Persistence, WEEK};
#[cfg(unix)]
pub use signal::spawn_signal_invalidation;

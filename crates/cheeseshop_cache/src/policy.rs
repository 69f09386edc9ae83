//! Per-function caching policy.

use derive_getters::Getters;
use std::time::Duration;

/// One minute.
pub const MINUTE: Duration = Duration::from_secs(60);
/// One hour.
pub const HOUR: Duration = Duration::from_secs(60 * 60);
/// One day.
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);
/// One week.
pub const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Four weeks.
pub const MONTH: Duration = Duration::from_secs(4 * 7 * 24 * 60 * 60);

/// Where entries are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Persistence {
    /// Process memory only
    #[default]
    Memory,
    /// Memory, backed by a JSON file in the cache directory
    File,
}

/// How one cached function behaves.
///
/// # Examples
///
/// ```
/// use cheeseshop_cache::{CachePolicy, HOUR, Persistence};
///
/// let policy = CachePolicy::new("pypi.releases", 4 * HOUR)
///     .with_persistence(Persistence::File)
///     .with_skip_empty(true);
/// assert_eq!(policy.id(), "pypi.releases");
/// assert!(*policy.skip_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct CachePolicy {
    /// Function identity, part of every key
    #[setters(skip)]
    id: String,
    /// How long entries stay valid
    timeout: Duration,
    /// Where entries are kept
    persistence: Persistence,
    /// Return empty results without caching them
    skip_empty: bool,
}

impl CachePolicy {
    /// Memory-only policy that caches every result.
    pub fn new(id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            id: id.into(),
            timeout,
            persistence: Persistence::Memory,
            skip_empty: false,
        }
    }
}

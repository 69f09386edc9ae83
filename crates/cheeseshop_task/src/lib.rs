//! Structured concurrency helpers.
//!
//! Every helper here owns the tasks it spawns: nothing outlives the call or
//! the stream that started it.
//!
//! - [`strict_gather`] runs futures concurrently and fails fast.
//! - [`join`] merges several streams into one bounded stream.
//! - [`fanout`] copies one stream into several bounded channels.
//! - [`KeyedLocks`] hands out one async mutex per key.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod fanout;
mod gather;
mod join;
mod locks;

pub use fanout::fanout;
pub use gather::strict_gather;
pub use join::{JoinedStream, join};
pub use locks::{KeyedLockGuard, KeyedLocks};

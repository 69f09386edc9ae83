//! Error types for the Cheeseshop package index.
//!
//! This crate provides the error types shared by every Cheeseshop crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! The top-level [`CheeseshopError`] keeps the concern distinguishable so the
//! HTTP boundary can map not-found to 404, integrity and configuration
//! failures to 5xx and conflicts to 409.
//!
//! # Examples
//!
//! ```
//! use cheeseshop_error::{CheeseshopResult, HttpError};
//!
//! fn fetch_index() -> CheeseshopResult<String> {
//!     Err(HttpError::new("Connection refused"))?
//! }
//!
//! let err = fetch_index().unwrap_err();
//! assert!(err.is_retryable());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod http;
mod integrity;
mod json;
mod not_found;
mod storage;
mod task;
mod upstream;
mod validation;

pub use cache::CacheError;
pub use config::ConfigError;
pub use error::{CheeseshopError, CheeseshopErrorKind, CheeseshopResult};
pub use http::HttpError;
pub use integrity::{IntegrityError, IntegrityErrorKind};
pub use json::JsonError;
pub use not_found::{NotFoundError, NotFoundErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use task::TaskError;
pub use upstream::{UpstreamError, UpstreamErrorKind};
pub use validation::ValidationError;

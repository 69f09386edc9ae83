//! Cheeseshop: the core of a self-hosted, PyPI-compatible package index.
//!
//! This facade loads configuration, installs logging and wires the pieces
//! from the member crates into a [`Cheeseshop`] service:
//!
//! - [`cheeseshop_storage`]: streaming payloads and multi-backend storage
//! - [`cheeseshop_cache`]: async single-flight TTL cache
//! - [`cheeseshop_proxy`]: upstream client, provider chain and mirror
//! - [`cheeseshop_task`]: stream joining and concurrent gathering
//!
//! # Example
//!
//! ```no_run
//! use cheeseshop::{Cheeseshop, CheeseshopConfig};
//!
//! # async fn example() -> cheeseshop::CheeseshopResult<()> {
//! let config = CheeseshopConfig::load()?;
//! let shop = Cheeseshop::from_config(&config).await?;
//! for release in shop.releases("requests").await? {
//!     println!("{}", release.version);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod logging;
mod service;

pub use crate::config::{CheeseshopConfig, LoggingConfig, LoggingConfigBuilder};
pub use logging::{filter_directive, init_tracing};
pub use service::Cheeseshop;

pub use cheeseshop_cache;
pub use cheeseshop_core;
pub use cheeseshop_error::{CheeseshopError, CheeseshopErrorKind, CheeseshopResult};
pub use cheeseshop_proxy;
pub use cheeseshop_storage;
pub use cheeseshop_task;

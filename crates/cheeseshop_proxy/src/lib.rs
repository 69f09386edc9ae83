//! Upstream proxying for the Cheeseshop package index.
//!
//! [`PypiClient`] answers package, release and search lookups from a
//! PyPI-compatible upstream through an [`IndexTransport`], caching every
//! answer in an [`AsyncCache`](cheeseshop_cache::AsyncCache) and retrying
//! transient failures. [`ProviderChain`] puts the local [`MemoryCatalog`] (or
//! any [`PackageCatalog`]) in front of upstream, and [`Mirror`] copies
//! upstream releases and files into local storage on demand.
//!
//! # Example
//!
//! ```no_run
//! use cheeseshop_cache::{AsyncCache, CacheConfig};
//! use cheeseshop_proxy::{ProxyConfig, PypiClient};
//!
//! # async fn example() -> cheeseshop_error::CheeseshopResult<()> {
//! let client = PypiClient::from_config(
//!     &ProxyConfig::default(),
//!     AsyncCache::new(CacheConfig::default()),
//! )?;
//! for release in client.releases("requests").await? {
//!     println!("{} hidden={}", release.version, release.hidden);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod catalog;
mod client;
mod config;
mod http;
mod mirror;
mod provider;
mod retry;
pub mod simple;
mod transport;
pub mod xmlrpc;

pub use catalog::{MemoryCatalog, PackageCatalog};
pub use client::PypiClient;
pub use config::{ListingMode, ProxyConfig, ProxyConfigBuilder};
pub use http::HttpIndexTransport;
pub use mirror::Mirror;
pub use provider::{PackageProvider, ProviderChain, UpstreamProvider};
pub use retry::RetryPolicy;
pub use transport::IndexTransport;

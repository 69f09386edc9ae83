//! Upstream proxy configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the full upstream package list is obtained.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListingMode {
    /// XML-RPC `list_packages`
    #[default]
    Xmlrpc,
    /// Anchors of the simple index page
    Simple,
}

/// The `[proxy]` section.
///
/// # Examples
///
/// ```
/// use cheeseshop_proxy::{ListingMode, ProxyConfig};
///
/// let config = ProxyConfig::default();
/// assert!(*config.enabled());
/// assert_eq!(config.url(), "https://pypi.org");
/// assert_eq!(*config.listing(), ListingMode::Xmlrpc);
/// assert_eq!(*config.retry_attempts(), 5);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(setter(into))]
pub struct ProxyConfig {
    /// Whether unknown packages are looked up upstream
    #[serde(default = "default_enabled")]
    #[builder(default = "true")]
    enabled: bool,

    /// Upstream index root
    #[serde(default = "default_url")]
    #[builder(default = "default_url()")]
    url: String,

    /// Package list source
    #[serde(default)]
    #[builder(default)]
    listing: ListingMode,

    /// Path of the simple index, used with `listing = "simple"`
    #[serde(default = "default_simple_list_path")]
    #[builder(default = "default_simple_list_path()")]
    simple_list_path: String,

    /// Concurrent requests to the upstream host
    #[serde(default = "default_connection_limit")]
    #[builder(default = "default_connection_limit()")]
    connection_limit: usize,

    /// Connect timeout and longest idle gap while reading, in seconds
    #[serde(default = "default_timeout_secs")]
    #[builder(default = "default_timeout_secs()")]
    timeout_secs: u64,

    /// Attempts per remote call, including the first
    #[serde(default = "default_retry_attempts")]
    #[builder(default = "default_retry_attempts()")]
    retry_attempts: usize,

    /// Initial backoff between attempts in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    #[builder(default = "default_retry_backoff_ms()")]
    retry_backoff_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_url() -> String {
    "https://pypi.org".to_string()
}

fn default_simple_list_path() -> String {
    "/simple/".to_string()
}

fn default_connection_limit() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> usize {
    5
}

fn default_retry_backoff_ms() -> u64 {
    100
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_url(),
            listing: ListingMode::default(),
            simple_list_path: default_simple_list_path(),
            connection_limit: default_connection_limit(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl ProxyConfig {
    /// Connect and idle-read timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

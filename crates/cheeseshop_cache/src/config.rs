//! Cache configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// The `[cache]` section.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "true")]
    enabled: bool,

    /// Directory for file-persisted entries; without it every entry stays in
    /// memory
    #[serde(default)]
    #[builder(default)]
    directory: Option<PathBuf>,

    /// Per-lookup timeouts
    #[serde(default)]
    #[builder(default)]
    ttl: TtlConfig,
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            directory: None,
            ttl: TtlConfig::default(),
        }
    }
}

/// The `[cache.ttl]` section, in seconds.
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
pub struct TtlConfig {
    /// Upstream package list (default one hour)
    #[serde(default = "default_packages_ttl")]
    #[builder(default = "default_packages_ttl()")]
    packages: u64,

    /// Release list of one package (default four hours)
    #[serde(default = "default_releases_ttl")]
    #[builder(default = "default_releases_ttl()")]
    releases: u64,

    /// Metadata and files of one release (default four weeks)
    #[serde(default = "default_release_data_ttl")]
    #[builder(default = "default_release_data_ttl()")]
    release_data: u64,

    /// Upstream search results (default four hours)
    #[serde(default = "default_search_ttl")]
    #[builder(default = "default_search_ttl()")]
    search: u64,
}

fn default_packages_ttl() -> u64 {
    crate::HOUR.as_secs()
}

fn default_releases_ttl() -> u64 {
    4 * crate::HOUR.as_secs()
}

fn default_release_data_ttl() -> u64 {
    crate::MONTH.as_secs()
}

fn default_search_ttl() -> u64 {
    4 * crate::HOUR.as_secs()
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            packages: default_packages_ttl(),
            releases: default_releases_ttl(),
            release_data: default_release_data_ttl(),
            search: default_search_ttl(),
        }
    }
}

impl TtlConfig {
    /// Package list timeout.
    pub fn packages_ttl(&self) -> Duration {
        Duration::from_secs(self.packages)
    }

    /// Release list timeout.
    pub fn releases_ttl(&self) -> Duration {
        Duration::from_secs(self.releases)
    }

    /// Release data timeout.
    pub fn release_data_ttl(&self) -> Duration {
        Duration::from_secs(self.release_data)
    }

    /// Search timeout.
    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search)
    }
}

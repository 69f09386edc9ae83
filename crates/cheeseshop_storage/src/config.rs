//! Backend registration from configuration.

use crate::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHUNK_SIZE, LocalStorage, MemoryStorage, Storage,
    StorageCollection,
};
use cheeseshop_error::{CheeseshopResult, ConfigError};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Kinds of backend that can be configured.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    /// [`LocalStorage`]
    Local,
    /// [`MemoryStorage`]
    Memory,
}

/// One `[[storage.backends]]` entry.
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
#[builder(setter(into))]
pub struct BackendConfig {
    /// Backend kind
    kind: BackendKind,
    /// Root directory (required for `local`)
    #[serde(default)]
    #[builder(default)]
    path: Option<PathBuf>,
    /// Disabled backends are skipped
    #[serde(default = "default_enabled")]
    #[builder(default = "true")]
    enabled: bool,
}

/// The `[storage]` section.
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
pub struct StorageConfig {
    /// Chunks buffered per backend during fan-out
    #[serde(default = "default_channel_capacity")]
    #[builder(default = "DEFAULT_CHANNEL_CAPACITY")]
    channel_capacity: usize,

    /// Bytes per chunk when reading files
    #[serde(default = "default_chunk_size")]
    #[builder(default = "DEFAULT_CHUNK_SIZE")]
    chunk_size: usize,

    /// Backends in priority order; the first enabled one is the primary
    #[serde(default)]
    #[builder(default)]
    backends: Vec<BackendConfig>,
}

fn default_enabled() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            chunk_size: default_chunk_size(),
            backends: Vec::new(),
        }
    }
}

/// Instantiate every enabled backend, in order.
///
/// # Errors
///
/// A configuration error for a `local` backend without a `path`.
pub fn build_backends(config: &StorageConfig) -> CheeseshopResult<Vec<Arc<dyn Storage>>> {
    config
        .backends
        .iter()
        .filter(|backend| backend.enabled)
        .map(|backend| -> CheeseshopResult<Arc<dyn Storage>> {
            match backend.kind {
                BackendKind::Local => {
                    let path = backend.path.as_ref().ok_or_else(|| {
                        ConfigError::new("A local storage backend requires a path")
                    })?;
                    Ok(Arc::new(
                        LocalStorage::new(path.clone()).with_chunk_size(config.chunk_size),
                    ))
                }
                BackendKind::Memory => Ok(Arc::new(MemoryStorage::new())),
            }
        })
        .collect()
}

impl StorageCollection {
    /// Build a collection from the `[storage]` section.
    #[tracing::instrument(skip(config), fields(backends = config.backends.len()))]
    pub fn from_config(config: &StorageConfig) -> CheeseshopResult<Self> {
        let backends = build_backends(config)?;
        for backend in &backends {
            tracing::debug!(backend = backend.name(), "Registered storage backend");
        }
        Ok(Self::from_backends(backends).with_channel_capacity(config.channel_capacity))
    }
}

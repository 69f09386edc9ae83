//! Layered TOML configuration.
//!
//! Every section has defaults, so an empty file is a valid configuration:
//! - Bundled defaults (include_str! from cheeseshop.toml)
//! - User overrides (~/.config/cheeseshop/cheeseshop.toml, then ./cheeseshop.toml)

use cheeseshop_cache::CacheConfig;
use cheeseshop_error::{CheeseshopError, CheeseshopResult, ConfigError};
use cheeseshop_proxy::ProxyConfig;
use cheeseshop_storage::StorageConfig;
use config::{Config, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// The `[logging]` section.
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
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    #[builder(default = "default_level()")]
    level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    #[builder(default)]
    json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Top-level Cheeseshop configuration.
///
/// # Example
///
/// ```no_run
/// use cheeseshop::CheeseshopConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CheeseshopConfig::load()?;
/// println!("Upstream: {}", config.proxy().url());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Getters)]
pub struct CheeseshopConfig {
    /// Log output
    #[serde(default)]
    logging: LoggingConfig,

    /// Storage backends
    #[serde(default)]
    storage: StorageConfig,

    /// Lookup cache
    #[serde(default)]
    cache: CacheConfig,

    /// Upstream index
    #[serde(default)]
    proxy: ProxyConfig,
}

impl CheeseshopConfig {
    /// Assemble a configuration from its sections.
    pub fn new(
        logging: LoggingConfig,
        storage: StorageConfig,
        cache: CacheConfig,
        proxy: ProxyConfig,
    ) -> Self {
        Self {
            logging,
            storage,
            cache,
            proxy,
        }
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> CheeseshopResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                CheeseshopError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                CheeseshopError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped when absent.
    #[instrument]
    pub fn load() -> CheeseshopResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../cheeseshop.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/cheeseshop/cheeseshop.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("cheeseshop").required(false));

        builder
            .build()
            .map_err(|e| {
                CheeseshopError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                CheeseshopError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}

//! Tracing subscriber setup for the binary.

use crate::LoggingConfig;
use cheeseshop_error::{CheeseshopResult, ConfigError};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive in effect for `config`.
///
/// `verbose` forces `debug`; otherwise the configured level applies.
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        config.level().clone()
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr
/// so command output on stdout stays machine-readable.
///
/// # Errors
///
/// Returns a configuration error for an invalid filter directive or when a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig, verbose: bool) -> CheeseshopResult<()> {
    let directive = filter_directive(config, verbose);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .map_err(|e| ConfigError::new(format!("Invalid log filter '{}': {}", directive, e)))?;

    let fmt_layer = if *config.json() {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ConfigError::new(format!("Failed to install subscriber: {}", e)))?;

    Ok(())
}

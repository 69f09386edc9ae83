//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the cheeseshop binary.

mod commands;
mod fetch;
mod lookup;

pub use commands::{Cli, Commands};
pub use fetch::handle_fetch;
pub use lookup::{handle_mirror, handle_release, handle_releases, handle_search};

//! Test utilities for the proxy crate.
//!
//! This module provides an in-memory upstream index and fixture helpers.

pub mod mock_index;

#[allow(unused_imports)]
pub use mock_index::{MockIndex, release, release_file};

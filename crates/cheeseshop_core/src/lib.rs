//! Core data types for the Cheeseshop package index.
//!
//! Packages, releases, file listings and search queries shared by the proxy
//! client, the catalog and the storage layer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod name;
mod package;
mod search;
mod version;

pub use name::normalize_package_name;
pub use package::{
    Package, Release, ReleaseData, ReleaseFile, ReleaseFileBuilder, ReleaseInfo,
};
pub use search::{SearchHit, SearchOperator, SearchQuery};
pub use version::ReleaseVersion;

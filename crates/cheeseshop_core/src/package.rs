//! Packages, releases and their file listings.

use crate::{ReleaseVersion, normalize_package_name};
use serde::{Deserialize, Serialize};

/// A package known to the index, under its canonical (as published) name.
///
/// # Examples
///
/// ```
/// use cheeseshop_core::Package;
///
/// let package = Package::new("Django", true);
/// assert_eq!(package.normalized_name(), "django");
/// assert!(package.is_proxy());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct Package {
    /// Name exactly as the owner published it
    name: String,
    /// True when the package is mirrored from upstream rather than uploaded
    #[getter(skip)]
    is_proxy: bool,
}

impl Package {
    /// Create a package record.
    pub fn new(name: impl Into<String>, is_proxy: bool) -> Self {
        Self {
            name: name.into(),
            is_proxy,
        }
    }

    /// Lookup key for this package.
    pub fn normalized_name(&self) -> String {
        normalize_package_name(&self.name)
    }

    /// Whether the package is mirrored from upstream.
    pub fn is_proxy(&self) -> bool {
        self.is_proxy
    }
}

/// One version of a package and whether upstream hides it.
///
/// Hidden releases are the ones upstream only lists when explicitly asked
/// for every release.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("{}", version)]
pub struct Release {
    /// Release version
    pub version: ReleaseVersion,
    /// Hidden on the upstream index
    pub hidden: bool,
}

impl Release {
    /// A release that upstream lists by default.
    pub fn current(version: impl Into<ReleaseVersion>) -> Self {
        Self {
            version: version.into(),
            hidden: false,
        }
    }

    /// A release that upstream only lists when asked for hidden releases.
    pub fn hidden(version: impl Into<ReleaseVersion>) -> Self {
        Self {
            version: version.into(),
            hidden: true,
        }
    }
}

/// Release metadata, as reported in the `info` block of the JSON API.
///
/// Every field except name and version is optional upstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Package name
    pub name: String,
    /// Release version
    pub version: String,
    /// One-line summary
    #[serde(default)]
    pub summary: Option<String>,
    /// Long description
    #[serde(default)]
    pub description: Option<String>,
    /// Author name
    #[serde(default)]
    pub author: Option<String>,
    /// Author email
    #[serde(default)]
    pub author_email: Option<String>,
    /// Project home page
    #[serde(default)]
    pub home_page: Option<String>,
    /// License string
    #[serde(default)]
    pub license: Option<String>,
    /// Keywords
    #[serde(default)]
    pub keywords: Option<String>,
    /// Trove classifiers
    #[serde(default)]
    pub classifiers: Vec<String>,
    /// Python version specifier
    #[serde(default)]
    pub requires_python: Option<String>,
    /// Off-index download location for releases without uploaded files
    #[serde(default)]
    pub download_url: Option<String>,
}

/// One distributable file of a release.
///
/// # Examples
///
/// ```
/// use cheeseshop_core::ReleaseFileBuilder;
///
/// let file = ReleaseFileBuilder::default()
///     .filename("sample-1.0.tar.gz")
///     .url("https://files.example/sample-1.0.tar.gz")
///     .size(42u64)
///     .build()
///     .unwrap();
/// assert!(!file.fetched());
/// assert!(file.md5_digest().is_none());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct ReleaseFile {
    /// Basename, unique per index
    filename: String,
    /// Where upstream serves the bytes
    url: String,
    /// Hex MD5 digest, if published
    #[builder(default)]
    #[serde(default)]
    md5_digest: Option<String>,
    /// Hex SHA-256 digest, if published
    #[builder(default)]
    #[serde(default)]
    sha256_digest: Option<String>,
    /// Size in bytes
    size: u64,
    /// Distribution type (`sdist`, `bdist_wheel`, ...)
    #[builder(default)]
    #[serde(default)]
    packagetype: Option<String>,
    /// Free-form comment
    #[builder(default)]
    #[serde(default)]
    comment_text: Option<String>,
    /// True once the bytes are in local storage
    #[builder(default)]
    #[serde(default)]
    #[getter(skip)]
    fetched: bool,
}

impl ReleaseFile {
    /// Whether the bytes are already in local storage.
    pub fn fetched(&self) -> bool {
        self.fetched
    }

    /// Record that the bytes are now in local storage.
    pub fn set_fetched(&mut self, fetched: bool) {
        self.fetched = fetched;
    }
}

/// Metadata plus file listing for one release.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReleaseData {
    /// Release metadata
    pub info: ReleaseInfo,
    /// Files, sorted by filename
    pub files: Vec<ReleaseFile>,
}

impl ReleaseData {
    /// Look a file up by basename.
    pub fn file(&self, filename: &str) -> Option<&ReleaseFile> {
        self.files.iter().find(|file| file.filename == filename)
    }
}

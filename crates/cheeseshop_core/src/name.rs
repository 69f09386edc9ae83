//! Package name normalization.

use std::sync::LazyLock;

static SEPARATORS: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[-_.]+").expect("Valid separator regex"));

/// Canonical lookup key for a package name.
///
/// Lowercases and collapses runs of `-`, `_` and `.` into a single `-`, so
/// `Zope.Interface`, `zope_interface` and `zope-interface` all collide.
///
/// # Examples
///
/// ```
/// use cheeseshop_core::normalize_package_name;
///
/// assert_eq!(normalize_package_name("Zope.Interface"), "zope-interface");
/// assert_eq!(normalize_package_name("typing__extensions"), "typing-extensions");
/// ```
pub fn normalize_package_name(name: &str) -> String {
    SEPARATORS.replace_all(name.trim(), "-").to_lowercase()
}

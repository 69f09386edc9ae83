//! Loose release version ordering.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Component {
    // Declared first so alpha segments order before numeric ones:
    // `1.0a1` < `1.0.1`.
    Alpha(String),
    Numeric(u64),
}

/// A release version string with loose, component-wise ordering.
///
/// The string is split into runs of digits and runs of letters; dots and
/// other punctuation only separate. Numeric runs compare numerically, letter
/// runs lexicographically. Equality and hashing follow the components, so
/// `1.0`, `1-0` and `1_0` compare equal and collapse into one key in sets and
/// maps. The original text is kept for display; compare [`as_str`] when two
/// published spellings must stay apart.
///
/// [`as_str`]: ReleaseVersion::as_str
///
/// # Examples
///
/// ```
/// use cheeseshop_core::ReleaseVersion;
///
/// let older: ReleaseVersion = "1.9".into();
/// let newer: ReleaseVersion = "1.10".into();
/// assert!(older < newer);
/// assert_eq!(newer.to_string(), "1.10");
/// ```
#[derive(Debug, Clone, derive_more::Display)]
#[display("{}", raw)]
pub struct ReleaseVersion {
    raw: String,
    components: Vec<Component>,
}

impl ReleaseVersion {
    /// Parse a version string. Never fails; unknown characters only split.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let components = split_components(&raw);
        Self { raw, components }
    }

    /// The version exactly as published.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn split_components(raw: &str) -> Vec<Component> {
    let mut components = Vec::new();
    let mut chars = raw.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut run = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                run.push(d);
                chars.next();
            }
            // Runs too long for u64 still order sensibly as text.
            match run.parse::<u64>() {
                Ok(n) => components.push(Component::Numeric(n)),
                Err(_) => components.push(Component::Alpha(run)),
            }
        } else if c.is_alphabetic() {
            let mut run = String::new();
            while let Some(&a) = chars.peek().filter(|a| a.is_alphabetic()) {
                run.extend(a.to_lowercase());
                chars.next();
            }
            components.push(Component::Alpha(run));
        } else {
            chars.next();
        }
    }
    components
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for ReleaseVersion {}

impl Hash for ReleaseVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl From<&str> for ReleaseVersion {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ReleaseVersion {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl Serialize for ReleaseVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ReleaseVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

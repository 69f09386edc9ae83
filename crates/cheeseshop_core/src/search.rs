//! Search queries and results.

use cheeseshop_error::{CheeseshopError, ValidationError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How name and description criteria combine.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchOperator {
    /// Either criterion matches
    #[default]
    Or,
    /// Both criteria match
    And,
}

impl SearchOperator {
    /// Combine the two criterion outcomes.
    pub fn combine(self, name_matches: bool, description_matches: bool) -> bool {
        match self {
            Self::Or => name_matches || description_matches,
            Self::And => name_matches && description_matches,
        }
    }
}

impl FromStr for SearchOperator {
    type Err = CheeseshopError;

    /// Accepts `or` and `and`, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use cheeseshop_core::SearchOperator;
    ///
    /// assert_eq!("AND".parse::<SearchOperator>().unwrap(), SearchOperator::And);
    /// assert!("xor".parse::<SearchOperator>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "or" => Ok(Self::Or),
            "and" => Ok(Self::And),
            other => Err(ValidationError::new(format!(
                "Operator must be 'and' or 'or', got '{}'",
                other
            ))
            .into()),
        }
    }
}

/// A search over package names and descriptions.
///
/// A criterion with no terms never matches, so an `and` search needs terms on
/// both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Exact package names, compared after normalization
    #[serde(default)]
    pub names: Vec<String>,
    /// Substrings looked for in the description
    #[serde(default)]
    pub descriptions: Vec<String>,
    /// Combination rule
    #[serde(default)]
    pub operator: SearchOperator,
}

impl SearchQuery {
    /// Query with the given terms and operator.
    pub fn new(names: Vec<String>, descriptions: Vec<String>, operator: SearchOperator) -> Self {
        Self {
            names,
            descriptions,
            operator,
        }
    }

    /// Whether a package with this name and description satisfies the query.
    ///
    /// # Examples
    ///
    /// ```
    /// use cheeseshop_core::{SearchOperator, SearchQuery};
    ///
    /// let query = SearchQuery::new(
    ///     vec!["Requests".into()],
    ///     vec!["http".into()],
    ///     SearchOperator::And,
    /// );
    /// assert!(query.matches("requests", Some("Python HTTP for Humans.")));
    /// assert!(!query.matches("requests", Some("nothing relevant")));
    /// ```
    pub fn matches(&self, name: &str, description: Option<&str>) -> bool {
        self.matches_any(name, &[description])
    }

    /// Like [`matches`](Self::matches), where a description term may be
    /// found in any of `texts`.
    pub fn matches_any(&self, name: &str, texts: &[Option<&str>]) -> bool {
        let normalized = crate::normalize_package_name(name);
        let name_matches = self
            .names
            .iter()
            .any(|term| crate::normalize_package_name(term) == normalized);

        let texts: Vec<String> = texts.iter().flatten().map(|text| text.to_lowercase()).collect();
        let description_matches = self.descriptions.iter().any(|term| {
            let term = term.to_lowercase();
            !term.is_empty() && texts.iter().any(|text| text.contains(&term))
        });

        self.operator.combine(name_matches, description_matches)
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct SearchHit {
    /// Package name
    name: String,
    /// Matching version
    version: String,
    /// Summary text
    #[serde(default)]
    summary: Option<String>,
}

impl SearchHit {
    /// Create a search hit.
    pub fn new(name: impl Into<String>, version: impl Into<String>, summary: Option<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            summary,
        }
    }
}

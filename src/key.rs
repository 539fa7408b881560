//! Canonical cache keys built from structured parameters
//!
//! Keys render as `namespace?name=value&...` with parameters sorted by name
//! and form-url-encoded, so the same logical request always yields the same
//! key and parameter values cannot bleed into each other.

use std::collections::BTreeMap;
use std::fmt;

use url::form_urlencoded;

use crate::cache::{CacheError, KeyMatcher};

const PARAMS_SEPARATOR: char = '?';

/// Structured description of a cached resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    namespace: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    /// Starts a key for `namespace` (e.g. an endpoint name)
    ///
    /// # Errors
    /// Returns `CacheError::EmptyKey` if the namespace is empty or blank.
    pub fn new(namespace: impl Into<String>) -> Result<Self, CacheError> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(CacheError::EmptyKey);
        }
        Ok(Self {
            namespace,
            params: BTreeMap::new(),
        })
    }

    /// Adds a parameter. A repeated name replaces the earlier value.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Adds a parameter only when `value` is present
    pub fn param_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Renders the canonical string form
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Matcher for every key in this key's namespace
    pub fn family(&self) -> Namespace {
        Namespace::new(self.namespace.clone())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace)?;
        if self.params.is_empty() {
            return Ok(());
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        write!(f, "{}{}", PARAMS_SEPARATOR, query)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.render()
    }
}

/// Matches every key rendered from a given namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self(namespace.into())
    }
}

impl KeyMatcher for Namespace {
    fn matches(&self, key: &str) -> bool {
        match key.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(PARAMS_SEPARATOR),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_sorted() {
        let a = CacheKey::new("analytics")
            .unwrap()
            .param("sport", "basketball")
            .param("league", "nba")
            .param("parlay_type", "two_leg");
        let b = CacheKey::new("analytics")
            .unwrap()
            .param("parlay_type", "two_leg")
            .param("league", "nba")
            .param("sport", "basketball");

        assert_eq!(a.render(), b.render());
        assert_eq!(
            a.render(),
            "analytics?league=nba&parlay_type=two_leg&sport=basketball"
        );
    }

    #[test]
    fn test_namespace_only() {
        let key = CacheKey::new("leaders").unwrap();
        assert_eq!(key.render(), "leaders");
    }

    #[test]
    fn test_separators_in_values_do_not_collide() {
        let tricky = CacheKey::new("search").unwrap().param("q", "a&b=c");
        let split = CacheKey::new("search")
            .unwrap()
            .param("q", "a")
            .param("b", "c");

        assert_ne!(tricky.render(), split.render());
        assert_eq!(tricky.render(), "search?q=a%26b%3Dc");
    }

    #[test]
    fn test_numeric_and_optional_params() {
        let key = CacheKey::new("games")
            .unwrap()
            .param("season", 2024)
            .param_opt("team", None::<&str>)
            .param_opt("week", Some(7));

        assert_eq!(key.render(), "games?season=2024&week=7");
    }

    #[test]
    fn test_empty_namespace_rejected() {
        assert!(matches!(CacheKey::new(""), Err(CacheError::EmptyKey)));
        assert!(matches!(CacheKey::new("   "), Err(CacheError::EmptyKey)));
    }

    #[test]
    fn test_namespace_matcher() {
        let odds = CacheKey::new("odds").unwrap();
        let family = odds.family();

        assert!(family.matches("odds"));
        assert!(family.matches(&odds.clone().param("sport", "nba").render()));
        assert!(!family.matches("odds-live?sport=nba"));
        assert!(!family.matches("analytics?sport=nba"));
    }
}

//! Key predicates used for bulk invalidation

use regex::Regex;

/// Decides whether a stored key belongs to a family of keys
pub trait KeyMatcher {
    fn matches(&self, key: &str) -> bool;
}

impl<F> KeyMatcher for F
where
    F: Fn(&str) -> bool,
{
    fn matches(&self, key: &str) -> bool {
        self(key)
    }
}

impl KeyMatcher for Regex {
    fn matches(&self, key: &str) -> bool {
        self.is_match(key)
    }
}

/// Matches every key starting with the given prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix(pub String);

impl Prefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }
}

impl KeyMatcher for Prefix {
    fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.0)
    }
}

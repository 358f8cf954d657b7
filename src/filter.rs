use crate::error::{Error, Result};
use regex::Regex;

/// Compiled rule deciding which discovered links become documents.
#[derive(Debug, Clone)]
pub enum LinkPattern {
    /// Link text starts with the given literal.
    Prefix(String),
    Regex(Regex),
}

impl LinkPattern {
    /// Compile a user-supplied pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| Error::PatternCompile {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(LinkPattern::Regex(regex))
    }

    /// Match every URL whose text starts with `seed`.
    pub fn starts_with(seed: &str) -> Self {
        LinkPattern::Prefix(seed.to_string())
    }

    /// The user pattern when given, otherwise the "starts with the seed" default.
    pub fn for_seed(seed: &str, pattern: Option<&str>) -> Result<Self> {
        match pattern {
            Some(pattern) => Self::new(pattern),
            None => Ok(Self::starts_with(seed)),
        }
    }

    /// Regex patterns search anywhere in the link text.
    pub fn matches(&self, link: &str) -> bool {
        match self {
            LinkPattern::Prefix(prefix) => link.starts_with(prefix.as_str()),
            LinkPattern::Regex(regex) => regex.is_match(link),
        }
    }
}

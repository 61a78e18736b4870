//! Pattern Compiler
//!
//! Turns wildcard route specs such as `/admin/*` into anchored matchers.

use regex::Regex;

use crate::error::{CacheError, Result};

// == Route Pattern ==
/// A compiled route matcher.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Regex(Regex),
}

impl RoutePattern {
    /// Compiles `pattern`, where `*` matches zero or more of any character.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            source: pattern.to_string(),
            matcher: Matcher::Regex(wildcard_to_regex(pattern)?),
        })
    }

    /// Pattern that matches every route.
    pub fn match_all() -> Self {
        Self {
            source: "*".to_string(),
            matcher: Matcher::Any,
        }
    }

    /// Returns true if the whole `route` matches.
    pub fn is_match(&self, route: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Regex(regex) => regex.is_match(route),
        }
    }

    /// The wildcard spec this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

// == Wildcard To Regex ==
/// Compiles a wildcard string into a full-string regex.
///
/// Only `*` is special; every other character, regex metacharacters included,
/// is matched literally.
pub fn wildcard_to_regex(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(?s:.*)");

    Regex::new(&format!("^{}$", body)).map_err(|source| CacheError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

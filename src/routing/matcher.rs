//! URL pattern matching.
//!
//! # Responsibilities
//! - Turn a registered URL pattern into the context prefix it serves
//! - Match request paths against that prefix on segment boundaries
//! - Hand back the sub-path below the prefix
//!
//! # Design Decisions
//! - Patterns are opaque strings for registration; only the trailing `/*`
//!   wildcard convention is interpreted, and only here
//! - Path matching is case-sensitive
//! - `/` and `/*` match every path
//! - No regex to guarantee O(n) matching

use std::fmt;

/// Error for a pattern that cannot be mounted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("URL pattern is empty")]
    Empty,

    #[error("URL pattern {0:?} must start with '/'")]
    NotAbsolute(String),
}

/// A registered URL pattern and the prefix it matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlPattern {
    raw: String,
    prefix: String,
}

impl UrlPattern {
    pub fn parse(raw: impl Into<String>) -> Result<Self, PatternError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute(raw));
        }

        let prefix = raw
            .strip_suffix("/*")
            .unwrap_or(&raw)
            .trim_end_matches('/')
            .to_string();

        Ok(Self { raw, prefix })
    }

    /// The pattern exactly as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The context prefix; empty for the root.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Longer prefixes are more specific.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }

    /// Returns the sub-path below the prefix if `path` is served by this
    /// pattern. The sub-path is empty or starts with `/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_patterns() {
        assert_eq!(UrlPattern::parse(""), Err(PatternError::Empty));
        assert_eq!(
            UrlPattern::parse("web"),
            Err(PatternError::NotAbsolute("web".into()))
        );
    }

    #[test]
    fn wildcard_and_trailing_slash_share_a_prefix() {
        assert_eq!(UrlPattern::parse("/web/api/*").unwrap().prefix(), "/web/api");
        assert_eq!(UrlPattern::parse("/web/api/").unwrap().prefix(), "/web/api");
        assert_eq!(UrlPattern::parse("/web/api").unwrap().prefix(), "/web/api");
        assert_eq!(UrlPattern::parse("/*").unwrap().prefix(), "");
        assert_eq!(UrlPattern::parse("/").unwrap().prefix(), "");
    }

    #[test]
    fn matches_on_segment_boundaries() {
        let pattern = UrlPattern::parse("/web").unwrap();
        assert_eq!(pattern.strip("/web"), Some(""));
        assert_eq!(pattern.strip("/web/"), Some("/"));
        assert_eq!(pattern.strip("/web/a.html"), Some("/a.html"));
        assert_eq!(pattern.strip("/webapp"), None);
        assert_eq!(pattern.strip("/other"), None);
        assert!(!pattern.matches("/WEB"));
    }

    #[test]
    fn root_matches_everything() {
        let pattern = UrlPattern::parse("/").unwrap();
        assert_eq!(pattern.strip("/anything/at/all"), Some("/anything/at/all"));
        assert_eq!(pattern.specificity(), 0);
    }
}

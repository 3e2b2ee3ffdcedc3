//! Registration registry and conflict policy.
//!
//! # Responsibilities
//! - Record which kind each URL pattern is bound to
//! - Decide whether a new registration is admitted
//!
//! # Policy (existing → requested)
//! ```text
//! none      → any        admitted
//! any       → Denial     admitted, overwrites
//! Denial    → Servlet    refused (not an error)
//! Resource  → Servlet    admitted, overwrites
//! Redirect  → Servlet    admitted, overwrites
//! same kind → same kind  admitted, idempotent
//! otherwise              ConflictError
//! ```
//!
//! Together with the discovery order (configurations before servlets) this
//! yields the precedence Denial > Servlet > Redirection > Resource.
//! Patterns are compared by exact string equality.

use std::collections::HashMap;
use std::fmt;

/// The category a URL pattern is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistrationKind {
    Denial,
    Redirection,
    Resource,
    Servlet,
}

impl RegistrationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationKind::Denial => "denial",
            RegistrationKind::Redirection => "redirection",
            RegistrationKind::Resource => "resource",
            RegistrationKind::Servlet => "servlet",
        }
    }

    /// Precedence rank, higher wins.
    pub fn precedence(self) -> u8 {
        match self {
            RegistrationKind::Denial => 3,
            RegistrationKind::Servlet => 2,
            RegistrationKind::Redirection => 1,
            RegistrationKind::Resource => 0,
        }
    }
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pattern is already bound to an incompatible kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("URL pattern {pattern:?} is already registered as {existing}, cannot register as {requested}")]
pub struct ConflictError {
    pub pattern: String,
    pub existing: RegistrationKind,
    pub requested: RegistrationKind,
}

/// Result of an admitted registration check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Pattern was free.
    New,
    /// Pattern already has this kind.
    Unchanged,
    /// Pattern had another kind that the requested one overrides.
    Overrides(RegistrationKind),
    /// A servlet asked for a denied pattern; skip it.
    Refused,
}

impl Admission {
    pub fn is_refused(self) -> bool {
        matches!(self, Admission::Refused)
    }
}

/// Mapping from URL pattern to registration kind.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    entries: HashMap<String, RegistrationKind>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pattern: &str) -> Option<RegistrationKind> {
        self.entries.get(pattern).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, RegistrationKind)> {
        self.entries.iter().map(|(p, k)| (p.as_str(), *k))
    }

    /// Apply the policy without mutating anything.
    pub fn check(&self, pattern: &str, requested: RegistrationKind) -> Result<Admission, ConflictError> {
        use RegistrationKind::*;

        let Some(existing) = self.get(pattern) else {
            return Ok(Admission::New);
        };

        match (existing, requested) {
            (e, r) if e == r => Ok(Admission::Unchanged),
            (e, Denial) => Ok(Admission::Overrides(e)),
            (Denial, Servlet) => Ok(Admission::Refused),
            (e @ (Resource | Redirection), Servlet) => Ok(Admission::Overrides(e)),
            (existing, requested) => Err(ConflictError {
                pattern: pattern.to_string(),
                existing,
                requested,
            }),
        }
    }

    /// Record a kind. Callers check first.
    pub fn insert(&mut self, pattern: &str, kind: RegistrationKind) {
        self.entries.insert(pattern.to_string(), kind);
    }

    /// Check and record in one step.
    pub fn register(&mut self, pattern: &str, kind: RegistrationKind) -> Result<Admission, ConflictError> {
        let admission = self.check(pattern, kind)?;
        if !admission.is_refused() {
            self.insert(pattern, kind);
        }
        Ok(admission)
    }
}

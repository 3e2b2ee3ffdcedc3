//! Logical (portable) paths.
//!
//! A portable path is rooted in one of a few named areas and is only turned
//! into a file-system path against a [`PortableRoots`] table:
//!
//! ```text
//! program:web/panel     → <program_dir>/web/panel
//! preference:web/panel  → <preferences_dir>/web/panel
//! home:notes            → <home_dir>/notes
//! /srv/www              → /srv/www (plain path)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::PathsConfig;

pub const PROGRAM: &str = "program:";
pub const PREFERENCES: &str = "preference:";
pub const HOME: &str = "home:";

/// A named logical root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    Program,
    Preferences,
    Home,
}

impl Root {
    pub fn prefix(self) -> &'static str {
        match self {
            Root::Program => PROGRAM,
            Root::Preferences => PREFERENCES,
            Root::Home => HOME,
        }
    }
}

/// A path in the logical namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortablePath {
    /// Relative path under a named root.
    Rooted { root: Root, relative: String },
    /// Anything without a known root prefix.
    Plain(PathBuf),
}

impl PortablePath {
    pub fn parse(path: &str) -> Self {
        for root in [Root::Program, Root::Preferences, Root::Home] {
            if let Some(rest) = path.strip_prefix(root.prefix()) {
                return PortablePath::Rooted {
                    root,
                    relative: rest.trim_start_matches('/').to_string(),
                };
            }
        }
        PortablePath::Plain(PathBuf::from(path))
    }

    pub fn root(&self) -> Option<Root> {
        match self {
            PortablePath::Rooted { root, .. } => Some(*root),
            PortablePath::Plain(_) => None,
        }
    }

    /// The same relative path under the preferences root, for program paths.
    pub fn preference_shadow(&self) -> Option<PortablePath> {
        match self {
            PortablePath::Rooted {
                root: Root::Program,
                relative,
            } => Some(PortablePath::Rooted {
                root: Root::Preferences,
                relative: relative.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for PortablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortablePath::Rooted { root, relative } => write!(f, "{}{}", root.prefix(), relative),
            PortablePath::Plain(path) => write!(f, "{}", path.display()),
        }
    }
}

/// File-system directories backing each logical root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortableRoots {
    pub program: PathBuf,
    pub preferences: PathBuf,
    pub home: PathBuf,
}

impl PortableRoots {
    pub fn from_config(config: &PathsConfig) -> Self {
        Self {
            program: config.program_dir.clone(),
            preferences: config.preferences_dir.clone(),
            home: config.home_dir.clone(),
        }
    }

    pub fn dir(&self, root: Root) -> &Path {
        match root {
            Root::Program => &self.program,
            Root::Preferences => &self.preferences,
            Root::Home => &self.home,
        }
    }

    /// Resolve a portable path. Existence is not checked.
    pub fn absolute(&self, path: &PortablePath) -> PathBuf {
        match path {
            PortablePath::Rooted { root, relative } if relative.is_empty() => {
                self.dir(*root).to_path_buf()
            }
            PortablePath::Rooted { root, relative } => self.dir(*root).join(relative),
            PortablePath::Plain(path) => path.clone(),
        }
    }
}

/// Public URI for a portable path, for `preference:` and `program:` only.
pub fn uri_for_portable_path(path: &str) -> Option<String> {
    if let Some(rest) = path.strip_prefix(PREFERENCES) {
        Some(format!("/prefs/{rest}"))
    } else {
        path.strip_prefix(PROGRAM)
            .map(|rest| format!("/dist/{rest}"))
    }
}

//! Configuration contributions.
//!
//! A configuration contribution names resource mappings, redirections and
//! denials. Contributions come from code (`impl WebServerConfiguration`) or
//! from the `[[contributions]]` tables of the config file.

use std::collections::BTreeMap;

use crate::config::ContributionConfig;
use crate::resource::portable::{PREFERENCES, PROGRAM};

/// Path handling contributed to the web server.
pub trait WebServerConfiguration: Send + Sync {
    /// Identifier for logging.
    fn name(&self) -> &str;

    /// URL pattern to logical path.
    fn resource_paths(&self) -> BTreeMap<String, String>;

    /// URL pattern to redirect target.
    fn redirected_paths(&self) -> BTreeMap<String, String>;

    /// URL patterns to deny.
    fn forbidden_paths(&self) -> Vec<String>;
}

/// A contribution declared in the config file.
#[derive(Debug, Clone)]
pub struct StaticConfiguration {
    contribution: ContributionConfig,
}

impl StaticConfiguration {
    pub fn new(contribution: ContributionConfig) -> Self {
        Self { contribution }
    }
}

impl WebServerConfiguration for StaticConfiguration {
    fn name(&self) -> &str {
        &self.contribution.name
    }

    fn resource_paths(&self) -> BTreeMap<String, String> {
        self.contribution.resources.clone()
    }

    fn redirected_paths(&self) -> BTreeMap<String, String> {
        self.contribution.redirections.clone()
    }

    fn forbidden_paths(&self) -> Vec<String> {
        self.contribution.forbidden.clone()
    }
}

/// Serves the program and preferences roots at their public URIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortableRootsConfiguration;

impl WebServerConfiguration for PortableRootsConfiguration {
    fn name(&self) -> &str {
        "portable-roots"
    }

    fn resource_paths(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("/dist".to_string(), PROGRAM.to_string()),
            ("/prefs".to_string(), PREFERENCES.to_string()),
        ])
    }

    fn redirected_paths(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn forbidden_paths(&self) -> Vec<String> {
        Vec::new()
    }
}

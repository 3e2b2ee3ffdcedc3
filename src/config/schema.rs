//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the web server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration for the web server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WebServerConfig {
    /// Transport settings (port, worker bound, timeouts).
    pub server: ServerConfig,

    /// Roots of the logical path namespace.
    pub paths: PathsConfig,

    /// Service-discovery announcement settings.
    pub announcement: AnnouncementConfig,

    /// Shutdown sequencer settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Configuration contributions declared in the config file.
    pub contributions: Vec<ContributionConfig>,
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (without port), e.g. "0.0.0.0".
    pub bind_address: String,

    /// Port to listen on. Zero picks an ephemeral port.
    pub port: u16,

    /// Maximum concurrent connections being served (backpressure).
    pub max_workers: usize,

    /// Idle connection timeout in seconds.
    pub idle_timeout_secs: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long stop waits for in-flight connections to drain.
    pub drain_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 12080,
            max_workers: 1000,
            idle_timeout_secs: 5 * 60,
            request_timeout_secs: 60,
            drain_timeout_secs: 10,
        }
    }
}

/// Directories backing the logical roots.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for `program:` paths (installation area).
    pub program_dir: PathBuf,

    /// Root for `preference:` paths (user preferences area).
    pub preferences_dir: PathBuf,

    /// Root for `home:` paths.
    pub home_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            program_dir: PathBuf::from("."),
            preferences_dir: PathBuf::from("preferences"),
            home_dir: std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// Service-discovery announcement configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnnouncementConfig {
    /// Publish an announcement once the server has started.
    pub enabled: bool,

    /// Service type to announce.
    pub service_type: String,

    /// Value of the `path` property.
    pub path: String,
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_type: "_http._tcp.local.".to_string(),
            path: "/".to_string(),
        }
    }
}

/// Shutdown sequencer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Deadline for all shutdown tasks to report completion, in seconds.
    pub timeout_secs: u64,

    /// Interval between completion polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            poll_interval_ms: 100,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A configuration contribution declared in the config file.
///
/// ```toml
/// [[contributions]]
/// name = "panel"
/// resources = { "/panel" = "program:web/panel" }
/// redirections = { "/panels" = "/panel/" }
/// forbidden = ["/panel/private"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContributionConfig {
    /// Contribution identifier for logging.
    pub name: String,

    /// URL pattern to logical path.
    pub resources: BTreeMap<String, String>,

    /// URL pattern to redirect target.
    pub redirections: BTreeMap<String, String>,

    /// URL patterns to deny.
    pub forbidden: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: WebServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 12080);
        assert_eq!(config.server.max_workers, 1000);
        assert_eq!(config.server.idle_timeout_secs, 300);
        assert_eq!(config.announcement.service_type, "_http._tcp.local.");
        assert!(config.contributions.is_empty());
    }

    #[test]
    fn parses_contributions() {
        let config: WebServerConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [[contributions]]
            name = "panel"
            resources = { "/panel" = "program:web/panel" }
            redirections = { "/panels" = "/panel/" }
            forbidden = ["/panel/private"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        let contribution = &config.contributions[0];
        assert_eq!(contribution.name, "panel");
        assert_eq!(contribution.resources["/panel"], "program:web/panel");
        assert_eq!(contribution.redirections["/panels"], "/panel/");
        assert_eq!(contribution.forbidden, vec!["/panel/private".to_string()]);
    }
}

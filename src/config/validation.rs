//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, worker bound > 0)
//! - Check every contributed URL pattern is well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WebServerConfig → Result<(), Vec<ValidationError>>
//! - Conflicts between contributions are not checked here; the registry
//!   resolves them at startup

use std::net::IpAddr;

use tokio::sync::Semaphore;

use crate::config::schema::WebServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.bind_address {0:?} is not an IP address")]
    BindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: usize },

    #[error("contribution {contribution:?}: invalid URL pattern {pattern:?}")]
    Pattern { contribution: String, pattern: String },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WebServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }
    if config.server.max_workers == 0 {
        errors.push(ValidationError::Zero("server.max_workers"));
    }
    if config.server.max_workers > Semaphore::MAX_PERMITS {
        errors.push(ValidationError::TooLarge {
            field: "server.max_workers",
            max: Semaphore::MAX_PERMITS,
        });
    }
    if config.server.idle_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.idle_timeout_secs"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.request_timeout_secs"));
    }
    if config.shutdown.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero("shutdown.poll_interval_ms"));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    for contribution in &config.contributions {
        let patterns = contribution
            .resources
            .keys()
            .chain(contribution.redirections.keys())
            .chain(contribution.forbidden.iter());
        for pattern in patterns {
            if !is_valid_pattern(pattern) {
                errors.push(ValidationError::Pattern {
                    contribution: contribution.name.clone(),
                    pattern: pattern.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_pattern(pattern: &str) -> bool {
    pattern.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ContributionConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&WebServerConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_error() {
        let mut config = WebServerConfig::default();
        config.server.bind_address = "nowhere".into();
        config.server.max_workers = 0;
        config.contributions.push(ContributionConfig {
            name: "broken".into(),
            forbidden: vec!["".into(), "relative".into(), "/ok".into()],
            ..Default::default()
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("server.max_workers")));
        assert!(errors.contains(&ValidationError::Pattern {
            contribution: "broken".into(),
            pattern: "relative".into(),
        }));
    }

    #[test]
    fn worker_bound_above_semaphore_limit_is_rejected() {
        let mut config = WebServerConfig::default();
        config.server.max_workers = usize::MAX;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::TooLarge {
                field: "server.max_workers",
                max: Semaphore::MAX_PERMITS,
            }]
        );
    }
}

//! Discovery loader.
//!
//! # Data Flow
//! ```text
//! controller start
//!     → every configuration contribution, in table order:
//!           resources → redirections → denials
//!     → every servlet contribution, in table order
//!     → RouteTable (registry + handler tree)
//! ```
//!
//! # Design Decisions
//! - Contributions are an explicit table built by the composition root
//!   (compiled-in entries plus the config file), not ambient plugin lookup
//! - Configurations are fully applied before any servlet; that ordering is
//!   what lets servlets override resources and redirections
//! - A failing contribution is logged and skipped; discovery continues
//! - Order among contributions of the same kind carries no meaning

pub mod configuration;

use std::sync::Arc;

use crate::config::WebServerConfig;
use crate::handler::ServletDescriptor;
use crate::routing::{RegistrationError, RouteTable};

pub use configuration::{PortableRootsConfiguration, StaticConfiguration, WebServerConfiguration};

/// What a discovery pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Patterns registered (including idempotent re-registrations).
    pub registered: usize,
    /// Contributions skipped because registration failed.
    pub skipped: Vec<String>,
    /// Servlet patterns refused because they were denied.
    pub refused: Vec<String>,
}

/// The contribution table.
#[derive(Clone, Default)]
pub struct Discovery {
    configurations: Vec<Arc<dyn WebServerConfiguration>>,
    servlets: Vec<ServletDescriptor>,
}

impl Discovery {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled-in contributions.
    pub fn builtin() -> Self {
        Self::new().with_configuration(PortableRootsConfiguration)
    }

    /// Compiled-in contributions plus those declared in the config file.
    pub fn from_config(config: &WebServerConfig) -> Self {
        config
            .contributions
            .iter()
            .cloned()
            .fold(Self::builtin(), |discovery, contribution| {
                discovery.with_configuration(StaticConfiguration::new(contribution))
            })
    }

    pub fn with_configuration(mut self, configuration: impl WebServerConfiguration + 'static) -> Self {
        self.configurations.push(Arc::new(configuration));
        self
    }

    pub fn with_servlet(mut self, descriptor: ServletDescriptor) -> Self {
        self.servlets.push(descriptor);
        self
    }

    pub fn configurations(&self) -> &[Arc<dyn WebServerConfiguration>] {
        &self.configurations
    }

    pub fn servlets(&self) -> &[ServletDescriptor] {
        &self.servlets
    }

    /// Register every contribution with `routes`.
    pub fn apply(&self, routes: &RouteTable) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for configuration in &self.configurations {
            let source = configuration.name();
            for (pattern, path) in configuration.resource_paths() {
                report.record(source, &pattern, routes.register_resource(&pattern, &path));
            }
            for (pattern, target) in configuration.redirected_paths() {
                report.record(source, &pattern, routes.register_redirection(&pattern, &target));
            }
            for pattern in configuration.forbidden_paths() {
                report.record(source, &pattern, routes.register_denial(&pattern));
            }
        }

        for descriptor in &self.servlets {
            match routes.register_servlet(descriptor, None) {
                Ok(outcome) => {
                    report.registered += outcome.mounted.len();
                    report.refused.extend(outcome.refused);
                    let name = descriptor.name();
                    report
                        .skipped
                        .extend(outcome.invalid.iter().map(|pattern| format!("{name}:{pattern}")));
                }
                Err(e) => {
                    tracing::error!(servlet = %descriptor.name(), error = %e, "Unable to register servlet");
                    report.skipped.push(descriptor.name().to_string());
                }
            }
        }

        tracing::info!(
            registered = report.registered,
            skipped = report.skipped.len(),
            refused = report.refused.len(),
            "Discovery complete"
        );
        report
    }
}

impl DiscoveryReport {
    fn record(&mut self, source: &str, pattern: &str, result: Result<(), RegistrationError>) {
        match result {
            Ok(()) => self.registered += 1,
            Err(e) => {
                tracing::error!(contribution = %source, pattern = %pattern, error = %e, "Skipping contribution");
                self.skipped.push(format!("{source}:{pattern}"));
            }
        }
    }
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let configurations: Vec<&str> = self.configurations.iter().map(|c| c.name()).collect();
        f.debug_struct("Discovery")
            .field("configurations", &configurations)
            .field("servlets", &self.servlets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContributionConfig;
    use crate::handler::{DenialServlet, Servlet};
    use crate::resource::{PortableRoots, ResourceResolver};
    use crate::routing::RegistrationKind;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use futures_util::future::BoxFuture;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Api;

    impl Servlet for Api {
        fn service(&self, _request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
            Box::pin(async { Response::new(Body::from("api")) })
        }
    }

    fn routes() -> RouteTable {
        RouteTable::new(ResourceResolver::new(PortableRoots {
            program: PathBuf::from("/opt/app"),
            preferences: PathBuf::from("/prefs"),
            home: PathBuf::from("/home"),
        }))
    }

    fn contribution(name: &str) -> ContributionConfig {
        ContributionConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn resource_and_servlet_on_distinct_patterns() {
        let mut web = contribution("web");
        web.resources.insert("/web".into(), "program:web".into());

        let discovery = Discovery::new()
            .with_servlet(ServletDescriptor::of::<Api>("Api", &["/web/api/*"]))
            .with_configuration(StaticConfiguration::new(web));

        let routes = routes();
        let report = discovery.apply(&routes);

        assert_eq!(report.registered, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(routes.kind("/web"), Some(RegistrationKind::Resource));
        assert_eq!(routes.kind("/web/api/*"), Some(RegistrationKind::Servlet));
    }

    #[test]
    fn configurations_apply_before_servlets() {
        // Registered first in the table, but must still lose to the denial.
        let mut locked = contribution("locked");
        locked.forbidden.push("/admin".into());
        let mut files = contribution("files");
        files.resources.insert("/tools".into(), "program:tools".into());

        let discovery = Discovery::new()
            .with_servlet(ServletDescriptor::of::<Api>("Api", &["/admin", "/tools"]))
            .with_configuration(StaticConfiguration::new(locked))
            .with_configuration(StaticConfiguration::new(files));

        let routes = routes();
        let report = discovery.apply(&routes);

        assert_eq!(routes.kind("/admin"), Some(RegistrationKind::Denial));
        assert_eq!(routes.kind("/tools"), Some(RegistrationKind::Servlet));
        assert_eq!(report.refused, vec!["/admin".to_string()]);
    }

    #[test]
    fn conflicts_are_skipped_not_fatal() {
        let mut first = contribution("first");
        first.resources.insert("/web".into(), "program:web".into());
        let mut second = contribution("second");
        second.redirections.insert("/web".into(), "/elsewhere".into());
        second.redirections.insert("/old".into(), "/web".into());

        let discovery = Discovery::new()
            .with_configuration(StaticConfiguration::new(first))
            .with_configuration(StaticConfiguration::new(second));

        let routes = routes();
        let report = discovery.apply(&routes);

        assert_eq!(report.skipped, vec!["second:/web".to_string()]);
        assert_eq!(routes.kind("/web"), Some(RegistrationKind::Resource));
        assert_eq!(routes.kind("/old"), Some(RegistrationKind::Redirection));
    }

    #[test]
    fn failing_servlet_does_not_stop_discovery() {
        let broken = ServletDescriptor::with_constructor("Broken", &["/broken"], || {
            Err("needs hardware".into())
        });
        let discovery = Discovery::new()
            .with_servlet(broken)
            .with_servlet(ServletDescriptor::of::<Api>("Api", &["/api"]))
            .with_servlet(DenialServlet::descriptor(&["/hidden"]));

        let routes = routes();
        let report = discovery.apply(&routes);

        assert_eq!(report.skipped, vec!["Broken".to_string()]);
        assert_eq!(routes.kind("/broken"), None);
        assert_eq!(routes.kind("/api"), Some(RegistrationKind::Servlet));
        assert_eq!(routes.kind("/hidden"), Some(RegistrationKind::Denial));
    }

    #[test]
    fn malformed_servlet_pattern_is_reported_and_skipped() {
        let discovery = Discovery::new()
            .with_servlet(ServletDescriptor::of::<Api>("Api", &["api/*", "/api/*"]));

        let routes = routes();
        let report = discovery.apply(&routes);

        assert_eq!(report.registered, 1);
        assert_eq!(report.skipped, vec!["Api:api/*".to_string()]);
        assert_eq!(routes.kind("/api/*"), Some(RegistrationKind::Servlet));
    }

    #[test]
    fn from_config_includes_builtin_and_file_contributions() {
        let mut config = WebServerConfig::default();
        config.contributions.push(ContributionConfig {
            name: "panel".into(),
            resources: BTreeMap::from([("/panel".into(), "program:web/panel".into())]),
            ..Default::default()
        });

        let discovery = Discovery::from_config(&config);
        let names: Vec<&str> = discovery.configurations().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["portable-roots", "panel"]);

        let routes = routes();
        discovery.apply(&routes);
        assert_eq!(routes.kind("/dist"), Some(RegistrationKind::Resource));
        assert_eq!(routes.kind("/prefs"), Some(RegistrationKind::Resource));
        assert_eq!(routes.kind("/panel"), Some(RegistrationKind::Resource));
    }
}

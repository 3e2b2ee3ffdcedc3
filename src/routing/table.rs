//! Route table: the registration API.
//!
//! # Responsibilities
//! - Validate patterns and apply the registry policy
//! - Build mounts through the handler factory
//! - Publish a fresh handler tree after every successful registration
//!
//! # Design Decisions
//! - One mutex guards the registry and the authoritative tree together
//! - Readers (in-flight requests) load an immutable snapshot through
//!   `ArcSwap`, so they never observe a half-applied registration
//! - Registrations before start are simply published early; the transport
//!   serves whatever snapshot is current

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::handler::{self, InstantiationError, Registration, Servlet, ServletDescriptor};
use crate::observability::metrics;
use crate::resource::{PortablePath, ResourceResolver};
use crate::routing::matcher::{PatternError, UrlPattern};
use crate::routing::registry::{Admission, ConflictError, RegistrationKind, Registry};
use crate::routing::router::HandlerTree;

/// Error returned by the registration API.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Instantiation(#[from] InstantiationError),
}

/// Which of a servlet's declared patterns were mounted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServletRegistration {
    pub mounted: Vec<String>,
    /// Already denied.
    pub refused: Vec<String>,
    /// Malformed, skipped.
    pub invalid: Vec<String>,
}

#[derive(Debug, Default)]
struct RoutingState {
    registry: Registry,
    tree: HandlerTree,
}

/// Registry plus live handler tree.
#[derive(Debug)]
pub struct RouteTable {
    resolver: ResourceResolver,
    state: Mutex<RoutingState>,
    live: ArcSwap<HandlerTree>,
}

impl RouteTable {
    pub fn new(resolver: ResourceResolver) -> Self {
        Self {
            resolver,
            state: Mutex::new(RoutingState::default()),
            live: ArcSwap::from_pointee(HandlerTree::new()),
        }
    }

    pub fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    /// Deny access to everything under `pattern`. Always succeeds for a
    /// well-formed pattern and overwrites any previous registration.
    pub fn register_denial(&self, pattern: &str) -> Result<(), RegistrationError> {
        self.register(pattern, Registration::Denial).map(drop)
    }

    /// Serve files for `pattern` from a logical path.
    pub fn register_resource(&self, pattern: &str, logical_path: &str) -> Result<(), RegistrationError> {
        let path = PortablePath::parse(logical_path);
        self.register(pattern, Registration::Resource { path }).map(drop)
    }

    /// Redirect everything under `pattern` to `target`.
    pub fn register_redirection(&self, pattern: &str, target: &str) -> Result<(), RegistrationError> {
        let registration = Registration::Redirection {
            target: target.to_string(),
        };
        self.register(pattern, registration).map(drop)
    }

    /// Mount a servlet under each of its declared patterns, one instance per
    /// pattern. `instance`, when given, serves the first mounted pattern.
    ///
    /// Patterns already denied are refused and malformed patterns skipped;
    /// both are reported, not failed. An instantiation failure registers
    /// nothing.
    pub fn register_servlet(
        &self,
        descriptor: &ServletDescriptor,
        instance: Option<Arc<dyn Servlet>>,
    ) -> Result<ServletRegistration, RegistrationError> {
        let kind = if descriptor.is_denial() {
            RegistrationKind::Denial
        } else {
            RegistrationKind::Servlet
        };

        let mut state = self.lock();
        let mut outcome = ServletRegistration::default();

        let mut admitted = Vec::with_capacity(descriptor.url_patterns().len());
        for raw in descriptor.url_patterns() {
            let pattern = match UrlPattern::parse(raw.as_str()) {
                Ok(pattern) => pattern,
                Err(e) => {
                    tracing::error!(
                        servlet = %descriptor.name(),
                        pattern = %raw,
                        error = %e,
                        "Skipping malformed servlet URL pattern"
                    );
                    outcome.invalid.push(raw.clone());
                    continue;
                }
            };
            if state.registry.check(raw, kind)?.is_refused() {
                tracing::error!(
                    servlet = %descriptor.name(),
                    pattern = %raw,
                    "Unable to register servlet to provide denied URL"
                );
                outcome.refused.push(raw.clone());
            } else {
                admitted.push(pattern);
            }
        }

        let mut instance = instance;
        let mut registrations = Vec::with_capacity(admitted.len());
        for pattern in admitted {
            let registration = match kind {
                RegistrationKind::Denial => Registration::Denial,
                _ => {
                    let servlet = match instance.take() {
                        Some(servlet) => servlet,
                        None => descriptor.instantiate()?,
                    };
                    Registration::Servlet {
                        name: descriptor.name().to_string(),
                        servlet,
                    }
                }
            };
            registrations.push((pattern, registration));
        }

        for (pattern, registration) in registrations {
            tracing::debug!(
                servlet = %descriptor.name(),
                pattern = %pattern,
                "Creating servlet mount"
            );
            outcome.mounted.push(pattern.as_str().to_string());
            self.commit(&mut state, pattern, registration);
        }
        self.publish(&state);

        Ok(outcome)
    }

    /// The kind `pattern` is bound to, if any.
    pub fn kind(&self, pattern: &str) -> Option<RegistrationKind> {
        self.lock().registry.get(pattern)
    }

    /// All registrations, sorted by pattern.
    pub fn registrations(&self) -> Vec<(String, RegistrationKind)> {
        let state = self.lock();
        let mut all: Vec<_> = state
            .registry
            .iter()
            .map(|(pattern, kind)| (pattern.to_string(), kind))
            .collect();
        all.sort();
        all
    }

    /// The handler tree requests are currently dispatched against.
    pub fn snapshot(&self) -> Arc<HandlerTree> {
        self.live.load_full()
    }

    fn register(&self, pattern: &str, registration: Registration) -> Result<Admission, RegistrationError> {
        let pattern = UrlPattern::parse(pattern)?;
        let kind = registration.kind();

        let mut state = self.lock();
        let admission = match state.registry.check(pattern.as_str(), kind) {
            Ok(admission) => admission,
            Err(conflict) => {
                metrics::record_conflict();
                return Err(conflict.into());
            }
        };

        if let Admission::Overrides(previous) = admission {
            tracing::info!(pattern = %pattern, previous = %previous, kind = %kind, "Registration overrides previous kind");
        }

        self.commit(&mut state, pattern, registration);
        self.publish(&state);
        Ok(admission)
    }

    fn commit(&self, state: &mut RoutingState, pattern: UrlPattern, registration: Registration) {
        let kind = registration.kind();
        let mount = handler::build(pattern, registration, &self.resolver);
        state.registry.insert(mount.pattern().as_str(), kind);
        state.tree.mount(mount);
        metrics::record_registration(kind.as_str());
    }

    fn publish(&self, state: &RoutingState) {
        self.live.store(Arc::new(state.tree.clone()));
    }

    fn lock(&self) -> MutexGuard<'_, RoutingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

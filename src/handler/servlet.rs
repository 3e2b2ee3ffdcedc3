//! Servlet contributions.
//!
//! A servlet is a request-handling object that describes itself: a serving
//! name and the URL patterns it wants. The descriptor carries a no-argument
//! constructor so the server can create one instance per mounted pattern.

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;

use crate::http::response;

/// Serving name that turns a servlet's patterns into denials.
pub const DENIAL_SERVLET_NAME: &str = "DenialServlet";

/// Servlet names registered as `Denial` instead of `Servlet`.
const DENIAL_SERVLET_NAMES: &[&str] = &[DENIAL_SERVLET_NAME];

/// A request-handling object mounted under one URL pattern.
pub trait Servlet: Send + Sync + 'static {
    fn service(&self, request: Request<Body>) -> BoxFuture<'static, Response<Body>>;
}

/// The pattern a servlet instance is mounted under, attached to every request
/// it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountContext {
    pub pattern: String,
    pub prefix: String,
}

/// A discovered servlet type could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unable to instantiate servlet {servlet:?}: {reason}")]
pub struct InstantiationError {
    pub servlet: String,
    pub reason: String,
}

type Constructor = Arc<dyn Fn() -> Result<Arc<dyn Servlet>, String> + Send + Sync>;

/// Self-description of a servlet type.
#[derive(Clone)]
pub struct ServletDescriptor {
    name: String,
    url_patterns: Vec<String>,
    construct: Constructor,
}

impl ServletDescriptor {
    /// Describe a servlet type constructible with `Default`.
    pub fn of<T>(name: impl Into<String>, url_patterns: &[&str]) -> Self
    where
        T: Servlet + Default,
    {
        Self::with_constructor(name, url_patterns, || Ok(Arc::new(T::default()) as Arc<dyn Servlet>))
    }

    /// Describe a servlet type with a custom constructor.
    pub fn with_constructor<F>(name: impl Into<String>, url_patterns: &[&str], construct: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Servlet>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            url_patterns: url_patterns.iter().map(|p| p.to_string()).collect(),
            construct: Arc::new(construct),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url_patterns(&self) -> &[String] {
        &self.url_patterns
    }

    /// Whether this servlet's patterns are registered as denials.
    pub fn is_denial(&self) -> bool {
        DENIAL_SERVLET_NAMES.contains(&self.name.as_str())
    }

    pub fn instantiate(&self) -> Result<Arc<dyn Servlet>, InstantiationError> {
        (self.construct)().map_err(|reason| InstantiationError {
            servlet: self.name.clone(),
            reason,
        })
    }
}

impl fmt::Debug for ServletDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServletDescriptor")
            .field("name", &self.name)
            .field("url_patterns", &self.url_patterns)
            .finish_non_exhaustive()
    }
}

/// Refuses everything under its patterns.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenialServlet;

impl DenialServlet {
    pub fn descriptor(url_patterns: &[&str]) -> ServletDescriptor {
        ServletDescriptor::of::<DenialServlet>(DENIAL_SERVLET_NAME, url_patterns)
    }
}

impl Servlet for DenialServlet {
    fn service(&self, _request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        Box::pin(async { response::forbidden() })
    }
}

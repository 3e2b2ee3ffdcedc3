//! Handler subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (kind + payload)
//!     → factory.rs (single match over the kind)
//!     → Mount (one handler bound to one URL pattern)
//!     → inserted into the handler tree by the route table
//!
//! Per request:
//!     Mount::serve
//!         Denial      → 403
//!         Redirection → 302 Location: target
//!         Resource    → resource chain over the sub-path
//!         Servlet     → servlet.service(request + MountContext)
//! ```
//!
//! # Design Decisions
//! - Tagged variants instead of a handler class hierarchy
//! - Building a mount never touches the registry

pub mod factory;
pub mod servlet;

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::http::response;
use crate::resource::{PortablePath, ResourceChain};
use crate::routing::{RegistrationKind, UrlPattern};

pub use factory::build;
pub use servlet::{
    DenialServlet, InstantiationError, MountContext, Servlet, ServletDescriptor,
    DENIAL_SERVLET_NAME,
};

/// A registration request: the kind plus what that kind needs.
#[derive(Clone)]
pub enum Registration {
    Denial,
    Redirection { target: String },
    Resource { path: PortablePath },
    Servlet { name: String, servlet: Arc<dyn Servlet> },
}

impl Registration {
    pub fn kind(&self) -> RegistrationKind {
        match self {
            Registration::Denial => RegistrationKind::Denial,
            Registration::Redirection { .. } => RegistrationKind::Redirection,
            Registration::Resource { .. } => RegistrationKind::Resource,
            Registration::Servlet { .. } => RegistrationKind::Servlet,
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registration::Denial => f.write_str("Denial"),
            Registration::Redirection { target } => {
                f.debug_struct("Redirection").field("target", target).finish()
            }
            Registration::Resource { path } => f.debug_struct("Resource").field("path", path).finish(),
            Registration::Servlet { name, .. } => {
                f.debug_struct("Servlet").field("name", name).finish_non_exhaustive()
            }
        }
    }
}

/// The request-handling part of a mount.
#[derive(Clone)]
pub enum MountHandler {
    Denial,
    Redirection { target: String },
    Resource(ResourceChain),
    Servlet { name: String, servlet: Arc<dyn Servlet> },
}

/// One handler bound to exactly one URL pattern.
#[derive(Clone)]
pub struct Mount {
    pattern: UrlPattern,
    handler: MountHandler,
}

impl Mount {
    pub fn new(pattern: UrlPattern, handler: MountHandler) -> Self {
        Self { pattern, handler }
    }

    pub fn pattern(&self) -> &UrlPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &MountHandler {
        &self.handler
    }

    pub fn kind(&self) -> RegistrationKind {
        match self.handler {
            MountHandler::Denial => RegistrationKind::Denial,
            MountHandler::Redirection { .. } => RegistrationKind::Redirection,
            MountHandler::Resource(_) => RegistrationKind::Resource,
            MountHandler::Servlet { .. } => RegistrationKind::Servlet,
        }
    }

    /// Serve a request already routed to this mount.
    pub async fn serve(&self, mut request: Request<Body>) -> Response<Body> {
        match &self.handler {
            MountHandler::Denial => response::forbidden(),
            MountHandler::Redirection { target } => response::redirect(target),
            MountHandler::Resource(chain) => {
                let path = request.uri().path().to_string();
                let sub_path = self.pattern.strip(&path).unwrap_or_default();
                let (parts, _body) = request.into_parts();
                chain.serve(&parts, self.pattern.prefix(), sub_path).await
            }
            MountHandler::Servlet { servlet, .. } => {
                request.extensions_mut().insert(MountContext {
                    pattern: self.pattern.as_str().to_string(),
                    prefix: self.pattern.prefix().to_string(),
                });
                servlet.service(request).await
            }
        }
    }
}

impl fmt::Debug for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Mount");
        s.field("pattern", &self.pattern.as_str()).field("kind", &self.kind());
        match &self.handler {
            MountHandler::Redirection { target } => s.field("target", target),
            MountHandler::Resource(chain) => s.field("stages", &chain.stages()),
            MountHandler::Servlet { name, .. } => s.field("servlet", name),
            MountHandler::Denial => &mut s,
        };
        s.finish()
    }
}

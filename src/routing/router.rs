//! Handler tree lookup and dispatch.
//!
//! # Responsibilities
//! - Store one mount per registered URL pattern
//! - Look up the mount serving a request path
//! - Return an explicit not-found when nothing matches
//!
//! # Design Decisions
//! - Immutable once published (readers hold an `Arc` snapshot, no locks)
//! - O(n) path prefix scan (acceptable for typical mount counts)
//! - Longest prefix wins; equal prefixes fall back to kind precedence

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::handler::Mount;
use crate::http::response;
use crate::observability::metrics;

/// The set of mounted handlers, keyed by URL pattern.
#[derive(Debug, Clone, Default)]
pub struct HandlerTree {
    mounts: BTreeMap<String, Arc<Mount>>,
}

impl HandlerTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mount, replacing any mount for the same pattern.
    pub fn mount(&mut self, mount: Mount) -> Option<Arc<Mount>> {
        self.mounts
            .insert(mount.pattern().as_str().to_string(), Arc::new(mount))
    }

    pub fn get(&self, pattern: &str) -> Option<&Arc<Mount>> {
        self.mounts.get(pattern)
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn mounts(&self) -> impl Iterator<Item = &Arc<Mount>> {
        self.mounts.values()
    }

    /// Find the mount serving `path`.
    pub fn route(&self, path: &str) -> Option<&Arc<Mount>> {
        self.mounts
            .values()
            .filter(|mount| mount.pattern().matches(path))
            .max_by_key(|mount| (mount.pattern().specificity(), mount.kind().precedence()))
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let path = request.uri().path().to_string();

        let Some(mount) = self.route(&path).cloned() else {
            tracing::debug!(path = %path, "No mount matched");
            metrics::record_request("none", 404, start);
            return response::not_found();
        };

        let kind = mount.kind();
        tracing::debug!(
            path = %path,
            pattern = %mount.pattern(),
            kind = %kind,
            "Dispatching request"
        );

        let response = mount.serve(request).await;
        metrics::record_request(kind.as_str(), response.status().as_u16(), start);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{MountHandler, Servlet};
    use crate::routing::{RegistrationKind, UrlPattern};
    use axum::http::StatusCode;
    use futures_util::future::BoxFuture;

    struct Echo(&'static str);

    impl Servlet for Echo {
        fn service(&self, _request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
            let body = self.0;
            Box::pin(async move { Response::new(Body::from(body)) })
        }
    }

    fn servlet(pattern: &str, name: &'static str) -> Mount {
        Mount::new(
            UrlPattern::parse(pattern).unwrap(),
            MountHandler::Servlet {
                name: name.into(),
                servlet: Arc::new(Echo(name)),
            },
        )
    }

    fn denial(pattern: &str) -> Mount {
        Mount::new(UrlPattern::parse(pattern).unwrap(), MountHandler::Denial)
    }

    #[test]
    fn longest_prefix_wins() {
        let mut tree = HandlerTree::new();
        tree.mount(servlet("/", "root"));
        tree.mount(servlet("/web", "web"));
        tree.mount(servlet("/web/api/*", "api"));

        let pattern = |path| tree.route(path).map(|m| m.pattern().as_str().to_string());
        assert_eq!(pattern("/web/api/trains").as_deref(), Some("/web/api/*"));
        assert_eq!(pattern("/web/index.html").as_deref(), Some("/web"));
        assert_eq!(pattern("/webapp").as_deref(), Some("/"));
    }

    #[test]
    fn equal_prefixes_prefer_denial() {
        let mut tree = HandlerTree::new();
        tree.mount(servlet("/admin/*", "admin"));
        tree.mount(denial("/admin"));

        let mount = tree.route("/admin/users").unwrap();
        assert_eq!(mount.kind(), RegistrationKind::Denial);
    }

    #[test]
    fn remount_replaces() {
        let mut tree = HandlerTree::new();
        assert!(tree.mount(servlet("/a", "one")).is_none());
        assert!(tree.mount(servlet("/a", "two")).is_some());
        assert_eq!(tree.len(), 1);
    }

    #[tokio::test]
    async fn unmatched_is_not_found() {
        let mut tree = HandlerTree::new();
        tree.mount(servlet("/web", "web"));

        let response = tree
            .dispatch(Request::get("/elsewhere").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

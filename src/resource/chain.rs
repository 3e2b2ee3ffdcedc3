//! Layered directory serving.
//!
//! # Responsibilities
//! - Build the ordered stage list for a mounted logical path
//! - Try each directory stage in order, first hit wins
//! - Terminate with a not-found outcome
//!
//! # Design Decisions
//! - Directory existence is checked per request, never at registration, so an
//!   override directory created while running takes effect without a restart
//! - Only a 404 from a stage falls through; any other status is final

use std::path::PathBuf;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::http::response;
use crate::resource::portable::{PortablePath, PortableRoots};

/// One step of a resource chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Serve files from this directory if the requested file exists.
    Directory(PathBuf),
    /// Terminal stage: nothing served the request.
    NotFound,
}

/// An ordered list of stages tried in sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChain {
    stages: Vec<Stage>,
}

impl ResourceChain {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Serve `sub_path` (the request path with the mount prefix removed).
    pub async fn serve(&self, parts: &Parts, prefix: &str, sub_path: &str) -> Response<Body> {
        for stage in &self.stages {
            let dir = match stage {
                Stage::Directory(dir) => dir,
                Stage::NotFound => return response::not_found(),
            };

            let request = match stage_request(parts, sub_path) {
                Ok(request) => request,
                Err(e) => {
                    tracing::debug!(error = %e, path = %sub_path, "Unusable resource path");
                    return response::bad_request();
                }
            };

            let served = match ServeDir::new(dir).oneshot(request).await {
                Ok(served) => served,
                Err(never) => match never {},
            };

            if served.status() == StatusCode::NOT_FOUND {
                tracing::trace!(dir = %dir.display(), path = %sub_path, "Stage missed");
                continue;
            }

            return rebase_location(served.map(Body::new), prefix);
        }

        response::not_found()
    }
}

/// Build the request a directory stage sees: same method, headers and query,
/// path relative to the mount.
fn stage_request(parts: &Parts, sub_path: &str) -> Result<Request<Body>, axum::http::Error> {
    let path = if sub_path.is_empty() { "/" } else { sub_path };
    let uri = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .body(Body::empty())?;
    *request.headers_mut() = parts.headers.clone();
    Ok(request)
}

/// Directory redirects are produced relative to the stage; put the mount
/// prefix back in front.
fn rebase_location(mut response: Response<Body>, prefix: &str) -> Response<Body> {
    if !response.status().is_redirection() || prefix.is_empty() {
        return response;
    }

    let rebased = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|location| location.starts_with('/'))
        .and_then(|location| HeaderValue::from_str(&format!("{prefix}{location}")).ok());

    if let Some(location) = rebased {
        response.headers_mut().insert(header::LOCATION, location);
    }
    response
}

/// Builds resource chains for logical paths.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    roots: PortableRoots,
}

impl ResourceResolver {
    pub fn new(roots: PortableRoots) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &PortableRoots {
        &self.roots
    }

    /// Program paths get the preferences shadow in front so a user override
    /// wins over the installed file.
    pub fn resolve(&self, url_pattern: &str, path: &PortablePath) -> ResourceChain {
        tracing::debug!(pattern = %url_pattern, path = %path, "Setting up handler chain");

        let mut stages = Vec::with_capacity(3);
        if let Some(shadow) = path.preference_shadow() {
            stages.push(Stage::Directory(self.roots.absolute(&shadow)));
        }
        stages.push(Stage::Directory(self.roots.absolute(path)));
        stages.push(Stage::NotFound);

        ResourceChain::new(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn resolver(program: &std::path::Path, preferences: &std::path::Path) -> ResourceResolver {
        ResourceResolver::new(PortableRoots {
            program: program.to_path_buf(),
            preferences: preferences.to_path_buf(),
            home: program.to_path_buf(),
        })
    }

    fn get(uri: &str) -> Parts {
        Request::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn program_path_gets_three_stages() {
        let chain = resolver("/opt/app".as_ref(), "/prefs".as_ref())
            .resolve("/web", &PortablePath::parse("program:web"));
        assert_eq!(
            chain.stages(),
            &[
                Stage::Directory(PathBuf::from("/prefs/web")),
                Stage::Directory(PathBuf::from("/opt/app/web")),
                Stage::NotFound,
            ]
        );
    }

    #[test]
    fn other_paths_get_two_stages() {
        let resolver = resolver("/opt/app".as_ref(), "/prefs".as_ref());
        let chain = resolver.resolve("/p", &PortablePath::parse("preference:web"));
        assert_eq!(
            chain.stages(),
            &[Stage::Directory(PathBuf::from("/prefs/web")), Stage::NotFound]
        );

        let chain = resolver.resolve("/srv", &PortablePath::parse("/srv/www"));
        assert_eq!(chain.stages().len(), 2);
    }

    #[tokio::test]
    async fn override_shadows_base() {
        let program = tempfile::tempdir().unwrap();
        let preferences = tempfile::tempdir().unwrap();
        fs::create_dir_all(program.path().join("x")).unwrap();
        fs::create_dir_all(preferences.path().join("x")).unwrap();
        fs::write(program.path().join("x/a.html"), "base").unwrap();
        fs::write(preferences.path().join("x/a.html"), "override").unwrap();
        fs::write(program.path().join("x/b.html"), "only base").unwrap();

        let chain = resolver(program.path(), preferences.path())
            .resolve("/x", &PortablePath::parse("program:x"));

        let response = chain.serve(&get("/x/a.html"), "/x", "/a.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "override");

        let response = chain.serve(&get("/x/b.html"), "/x", "/b.html").await;
        assert_eq!(body_text(response).await, "only base");

        let response = chain.serve(&get("/x/c.html"), "/x", "/c.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn override_directory_created_later_takes_effect() {
        let program = tempfile::tempdir().unwrap();
        let preferences = tempfile::tempdir().unwrap();
        fs::create_dir_all(program.path().join("x")).unwrap();
        fs::write(program.path().join("x/a.html"), "base").unwrap();

        let chain = resolver(program.path(), preferences.path())
            .resolve("/x", &PortablePath::parse("program:x"));
        let response = chain.serve(&get("/x/a.html"), "/x", "/a.html").await;
        assert_eq!(body_text(response).await, "base");

        fs::create_dir_all(preferences.path().join("x")).unwrap();
        fs::write(preferences.path().join("x/a.html"), "late override").unwrap();
        let response = chain.serve(&get("/x/a.html"), "/x", "/a.html").await;
        assert_eq!(body_text(response).await, "late override");
    }
}

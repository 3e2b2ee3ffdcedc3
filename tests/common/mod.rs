//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tempfile::TempDir;

use web_server::handler::{MountContext, Servlet};
use web_server::{Discovery, LifecycleState, WebServer, WebServerConfig};

/// Program and preferences directories for one test.
pub struct Roots {
    pub program: TempDir,
    pub preferences: TempDir,
}

impl Roots {
    pub fn new() -> Self {
        Self {
            program: tempfile::tempdir().unwrap(),
            preferences: tempfile::tempdir().unwrap(),
        }
    }

    pub fn program_file(&self, relative: &str, contents: &str) {
        write_file(self.program.path(), relative, contents);
    }

    pub fn preference_file(&self, relative: &str, contents: &str) {
        write_file(self.preferences.path(), relative, contents);
    }

    /// Loopback config on an ephemeral port rooted at these directories.
    pub fn config(&self) -> WebServerConfig {
        let mut config = WebServerConfig::default();
        config.server.bind_address = "127.0.0.1".into();
        config.server.port = 0;
        config.server.drain_timeout_secs = 2;
        config.paths.program_dir = self.program.path().to_path_buf();
        config.paths.preferences_dir = self.preferences.path().to_path_buf();
        config
    }
}

fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Start `server` and wait until it is accepting connections.
pub async fn start(server: &WebServer) -> String {
    server.start().unwrap();
    let state = tokio::time::timeout(Duration::from_secs(5), server.wait_until_settled())
        .await
        .expect("server did not settle");
    assert_eq!(state, LifecycleState::Started);
    format!("http://{}", server.local_addr().unwrap())
}

/// Build, start and return a server with the given contributions.
pub async fn serve(config: WebServerConfig, discovery: Discovery) -> (WebServer, String) {
    let server = WebServer::builder(config).discovery(discovery).build();
    let base = start(&server).await;
    (server, base)
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Answers with the mount prefix and the request path.
#[derive(Default)]
pub struct EchoServlet;

impl Servlet for EchoServlet {
    fn service(&self, request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        let prefix = request
            .extensions()
            .get::<MountContext>()
            .map(|context| context.prefix.clone())
            .unwrap_or_default();
        let path = request.uri().path().to_string();
        Box::pin(async move { Response::new(Body::from(format!("echo {prefix} {path}"))) })
    }
}

/// Takes a while to answer.
#[derive(Default)]
pub struct SlowServlet;

impl Servlet for SlowServlet {
    fn service(&self, _request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Response::new(Body::from("slow"))
        })
    }
}

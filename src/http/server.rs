//! HTTP server setup and the accept loop.
//!
//! # Responsibilities
//! - Create the Axum Router that hands every request to the live handler tree
//! - Wire up middleware (request ID, tracing, timeout, worker limit)
//! - Accept connections within the worker limit
//! - Serve HTTP/1.1 and HTTP/2 per connection
//! - Drain in-flight connections on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
    Router,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
    service::TowerToHyperService,
};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::request::{MakeRequestUuidV4, RequestIdExt};
use crate::lifecycle::ShutdownSignal;
use crate::net::{ConnectionTracker, Listener, ListenerError, WorkerPermit};
use crate::routing::RouteTable;

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// HTTP transport for the route table.
pub struct HttpServer {
    app: Router,
    tracker: ConnectionTracker,
    idle_timeout: Duration,
    drain_timeout: Duration,
    max_streams: u32,
}

impl HttpServer {
    /// Create a new HTTP server serving `routes`.
    pub fn new(routes: Arc<RouteTable>, config: &ServerConfig) -> Self {
        Self {
            app: Self::build_router(routes, config),
            tracker: ConnectionTracker::new(),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            drain_timeout: Duration::from_secs(config.drain_timeout_secs),
            max_streams: u32::try_from(worker_limit(config)).unwrap_or(u32::MAX),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The concurrency limit is shared by every connection, so HTTP/2
    /// streams count against the same worker bound as HTTP/1 requests.
    #[allow(deprecated)]
    fn build_router(routes: Arc<RouteTable>, config: &ServerConfig) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(routes)
            .layer(GlobalConcurrencyLimitLayer::new(worker_limit(config)))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// The application service, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: Listener, shutdown: ShutdownSignal) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(
            address = %addr,
            max_workers = listener.max_workers(),
            "HTTP server starting"
        );

        let stopped = shutdown.triggered();
        tokio::pin!(stopped);

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = &mut stopped => break,
            };

            match accepted {
                Ok((stream, peer, permit)) => self.serve_connection(stream, peer, permit, &shutdown),
                Err(ListenerError::Closed) => return Err(ListenerError::Closed),
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }

        // Release the port before waiting on stragglers.
        drop(listener);
        tracing::info!(
            active = self.tracker.active_count(),
            "Listener closed, draining connections"
        );

        if !self.tracker.drain(self.drain_timeout).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed with connections still open"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn serve_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: WorkerPermit,
        shutdown: &ShutdownSignal,
    ) {
        let guard = self.tracker.track();
        let service = TowerToHyperService::new(self.app.clone());
        let idle_timeout = self.idle_timeout;
        let max_streams = self.max_streams;
        let stopped = shutdown.triggered();

        tracing::trace!(connection_id = %guard.id(), peer = %peer, "Connection accepted");

        tokio::spawn(async move {
            let _permit = permit;

            let mut builder = auto::Builder::new(TokioExecutor::new());
            builder
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(idle_timeout);
            builder.http2().max_concurrent_streams(max_streams);

            let connection = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(connection);
            tokio::pin!(stopped);

            let result = tokio::select! {
                result = connection.as_mut() => result,
                _ = &mut stopped => {
                    connection.as_mut().graceful_shutdown();
                    connection.await
                }
            };

            if let Err(e) = result {
                tracing::debug!(
                    connection_id = %guard.id(),
                    peer = %peer,
                    error = %e,
                    "Connection closed with error"
                );
            }
            drop(guard);
        });
    }
}

/// Request handlers allowed to run at once. The listener rejects bounds the
/// semaphore cannot hold, so clamping here only keeps construction total.
fn worker_limit(config: &ServerConfig) -> usize {
    config.max_workers.clamp(1, Semaphore::MAX_PERMITS)
}

/// Every request goes to whatever handler tree is live right now.
async fn dispatch(State(routes): State<Arc<RouteTable>>, request: Request) -> Response {
    let tree = routes.snapshot();
    tree.dispatch(request).await
}

fn request_span(request: &axum::http::Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request.request_id().unwrap_or("-"),
    )
}

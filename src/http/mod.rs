//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (hyper-util auto builder, HTTP/1.1 + HTTP/2)
//!     → middleware (request ID, tracing span, timeout)
//!     → routing::HandlerTree::dispatch (live snapshot)
//!     → response.rs (403 / 404 / 302 helpers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;

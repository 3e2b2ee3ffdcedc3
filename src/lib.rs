//! Embedded web server: path registration and routing.

pub mod announce;
pub mod config;
pub mod discovery;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resource;
pub mod routing;
pub mod server;

pub use config::WebServerConfig;
pub use discovery::Discovery;
pub use lifecycle::{LifecycleState, ShutdownManager};
pub use server::{ServerError, WebServer};

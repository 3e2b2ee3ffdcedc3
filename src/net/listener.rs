//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind the configured address and port
//! - Accept incoming TCP connections
//! - Enforce the worker bound via semaphore
//! - Disable linger on accepted sockets

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ServerConfig;

const BACKLOG: u32 = 1024;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(std::io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(std::io::Error),
    /// The worker semaphore was closed.
    #[error("Listener closed")]
    Closed,
}

/// A bounded TCP listener that limits concurrently served connections.
///
/// Uses a semaphore to enforce `max_workers`. When the limit is reached,
/// new connections will wait until a slot becomes available.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    workers: Arc<Semaphore>,
    max_workers: usize,
}

impl Listener {
    /// Bind to the configured address with address reuse enabled.
    pub fn bind(config: &ServerConfig) -> Result<Self, ListenerError> {
        if config.max_workers == 0 || config.max_workers > Semaphore::MAX_PERMITS {
            return Err(ListenerError::Bind(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "max_workers must be between 1 and {}, got {}",
                    Semaphore::MAX_PERMITS,
                    config.max_workers
                ),
            )));
        }

        let ip: IpAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        let addr = SocketAddr::new(ip, config.port);

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(ListenerError::Bind)?;
        socket.set_reuseaddr(true).map_err(ListenerError::Bind)?;
        socket.bind(addr).map_err(ListenerError::Bind)?;
        let inner = socket.listen(BACKLOG).map_err(ListenerError::Bind)?;

        let local_addr = inner.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %local_addr,
            max_workers = config.max_workers,
            "Listener bound"
        );

        Ok(Self {
            inner,
            workers: Arc::new(Semaphore::new(config.max_workers)),
            max_workers: config.max_workers,
        })
    }

    /// Accept a new connection, respecting the worker bound.
    ///
    /// Returns the stream and a permit that must be held for the connection's
    /// lifetime.
    #[allow(deprecated)]
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, WorkerPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        stream.set_linger(None).map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_workers = self.workers.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, WorkerPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}

/// A permit representing a worker slot.
///
/// Dropping it releases the slot, even if the connection handler panics.
#[derive(Debug)]
pub struct WorkerPermit {
    _permit: OwnedSemaphorePermit,
}

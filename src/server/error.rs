use crate::net::ListenerError;

/// Error type for the controller's lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `start` was called outside a Tokio runtime.
    #[error("no Tokio runtime available to run the transport")]
    NoRuntime,

    /// The transport could not bind or stopped serving.
    #[error("transport failed: {0}")]
    TransportStart(#[from] ListenerError),

    /// Waiting for the transport to finish failed.
    #[error("transport failed to stop: {0}")]
    TransportStop(String),

    /// `stop` was called before `start`.
    #[error("web server has not been started")]
    NotStarted,
}

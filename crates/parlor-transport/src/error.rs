use thiserror::Error;

/// Errors from the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    AcceptFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("failed to send: {0}")]
    SendFailed(String),

    #[error("failed to receive: {0}")]
    ReceiveFailed(String),
}

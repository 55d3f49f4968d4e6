//! Error types for the bingo live client.

use thiserror::Error;

/// Errors that can occur when using the bingo live client.
#[derive(Debug, Error)]
pub enum BingoClientError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configured game server endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// The server refused the identity token. The caller must re-authenticate
    /// before opening a new connection.
    #[error("session invalid: identity token rejected")]
    Unauthorized,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for bingo live client operations.
pub type Result<T> = std::result::Result<T, BingoClientError>;

//! Transport abstraction for the game server connection.
//!
//! A [`Transport`] is one open, bidirectional text-message channel. A
//! [`Connector`] opens a new transport for a session URL; the session task
//! calls it once per connection attempt, so reconnecting is just another call.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use bingo_live_client::error::BingoClientError;
//! use bingo_live_client::transport::{Connector, Transport};
//! use url::Url;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), BingoClientError> {
//!         // Send the JSON envelope over your transport
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, BingoClientError>> {
//!         // Return None when the connection is closed
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), BingoClientError> {
//!         todo!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&self, url: &Url) -> Result<MyTransport, BingoClientError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;
use url::Url;

use crate::close_codes::CloseCode;
use crate::error::BingoClientError;

/// A bidirectional text message transport to the game server.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON envelope.
/// Each call to [`recv`](Transport::recv) returns one complete JSON envelope.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because the session task
/// uses it inside `tokio::select!`. Cancelling it must not lose data.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`BingoClientError::TransportSend`] or
    /// [`BingoClientError::TransportClosed`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), BingoClientError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection was closed
    async fn recv(&mut self) -> Option<Result<String, BingoClientError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources.
    async fn close(&mut self) -> Result<(), BingoClientError>;

    /// Close code sent by the server, once [`recv`](Transport::recv) has
    /// returned `None`. Transports without close codes return `None`.
    fn close_code(&self) -> Option<CloseCode> {
        None
    }
}

/// Opens transports to the game server.
///
/// The URL already carries the identity token and stake as query parameters.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    /// Open one connection.
    ///
    /// # Errors
    ///
    /// Returns [`BingoClientError::Unauthorized`] if the server rejected the
    /// identity token during the handshake; the session will not retry. Any
    /// other error is a transport fault and is retried with backoff.
    async fn connect(&self, url: &Url) -> Result<Self::Transport, BingoClientError>;
}

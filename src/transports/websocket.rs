//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketConnector`] opens a [`WebSocketTransport`] per connection
//! attempt. Both `ws://` and `wss://` URLs are supported; TLS is handled via
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! The transport records the code of the server's close frame so the session
//! can tell an auth rejection (`1008`) apart from an ordinary drop. A stream
//! that ends without a close frame reports `1006`.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), bingo_live_client::BingoClientError> {
//! use bingo_live_client::{Transport, WebSocketTransport};
//!
//! let mut transport =
//!     WebSocketTransport::connect("ws://localhost:3001/ws?token=abc&stake=10").await?;
//! transport
//!     .send(r#"{"type":"join_room","payload":{"stake":10}}"#.to_string())
//!     .await?;
//!
//! if let Some(Ok(msg)) = transport.recv().await {
//!     println!("received: {msg}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use url::Url;

use crate::close_codes::CloseCode;
use crate::error::BingoClientError;
use crate::transport::{Connector, Transport};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
    close_code: Option<CloseCode>,
}

fn map_connect_error(error: WsError) -> BingoClientError {
    match &error {
        WsError::Http(response) if matches!(response.status().as_u16(), 401 | 403) => {
            BingoClientError::Unauthorized
        }
        WsError::Io(io) => BingoClientError::Io(std::io::Error::new(io.kind(), error)),
        _ => BingoClientError::Io(std::io::Error::other(error)),
    }
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`BingoClientError::Unauthorized`] if the upgrade was refused
    /// with HTTP 401 or 403, and [`BingoClientError::Io`] for every other
    /// failure. An underlying I/O error keeps its
    /// [`ErrorKind`](std::io::ErrorKind).
    pub async fn connect(url: &str) -> Result<Self, BingoClientError> {
        tracing::debug!("connecting to WebSocket server");

        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(map_connect_error)?;

        tracing::info!("WebSocket connection established");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
            close_code: None,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), BingoClientError> {
        if self.closed {
            return Err(BingoClientError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| BingoClientError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, BingoClientError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    self.close_code.get_or_insert(CloseCode::Abnormal);
                    return Some(Err(BingoClientError::TransportReceive(e.to_string())));
                }
                None => {
                    self.close_code.get_or_insert(CloseCode::Abnormal);
                    return None;
                }
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    let code = frame
                        .as_ref()
                        .map_or(CloseCode::Normal, |f| CloseCode::from(u16::from(f.code)));
                    tracing::debug!(code = code.as_u16(), ?frame, "received WebSocket close frame");
                    self.close_code = Some(code);
                    return None;
                }
                Message::Ping(_) => {
                    // tungstenite queues the pong itself.
                    tracing::trace!("received WebSocket ping");
                }
                Message::Pong(_) => {
                    tracing::trace!("received WebSocket pong");
                }
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), BingoClientError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| BingoClientError::TransportSend(e.to_string()))
    }

    fn close_code(&self) -> Option<CloseCode> {
        self.close_code
    }
}

/// Opens a [`WebSocketTransport`] for each connection attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &Url) -> Result<WebSocketTransport, BingoClientError> {
        WebSocketTransport::connect(url.as_str()).await
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, BingoClientError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, BingoClientError::Io(_)));
    }

    // ── Mock-server helpers ─────────────────────────────────────────────

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}/ws")
    }

    // ── Tests ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn recv_receives_text_messages() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"pong"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"type":"pong"}"#);
    }

    #[tokio::test]
    async fn close_frame_code_is_recorded() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(Some(CloseFrame {
                code: WsCloseCode::Policy,
                reason: "token expired".into(),
            }))
            .await
            .unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
        assert_eq!(transport.close_code(), Some(CloseCode::PolicyViolation));
    }

    #[tokio::test]
    async fn close_without_frame_is_normal() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
        assert_eq!(transport.close_code(), Some(CloseCode::Normal));
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, "after_binary");
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url = start_mock_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, BingoClientError::TransportClosed));
    }

    #[tokio::test]
    async fn connector_passes_query_parameters() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut seen_tx = Some(seen_tx);
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                if let Some(tx) = seen_tx.take() {
                    let _ = tx.send(req.uri().to_string());
                }
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        });

        let url = Url::parse(&format!("ws://{addr}/ws?token=abc&stake=10")).unwrap();
        let mut transport = WebSocketConnector::new().connect(&url).await.unwrap();
        assert_eq!(seen_rx.await.unwrap(), "/ws?token=abc&stake=10");
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn rejected_upgrade_is_unauthorized() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = |_req: &Request, _resp: Response| -> Result<Response, ErrorResponse> {
                let rejection = tokio_tungstenite::tungstenite::http::Response::builder()
                    .status(401)
                    .body(None)
                    .unwrap();
                Err(rejection)
            };
            let _ = tokio_tungstenite::accept_hdr_async(tcp, callback).await;
        });

        let url = Url::parse(&format!("ws://{addr}/ws?token=bad&stake=10")).unwrap();
        let err = WebSocketConnector::new().connect(&url).await.unwrap_err();
        assert!(matches!(err, BingoClientError::Unauthorized));
    }
}

//! # Bingo Live Client
//!
//! Real-time game-state synchronization for stake-based multiplayer bingo.
//!
//! The client keeps one connection per (stake, identity token), declares its
//! room on every connect, and folds the server's message stream into a single
//! [`RoundSnapshot`]: phase, called numbers, this player's card, winners. It
//! reconnects with exponential backoff and resyncs from the server's full-state
//! snapshot, and it refuses card picks and bingo claims outside their phase.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   [`WebSocketConnector`]
//! - **Pure reducer**: [`reduce`](reducer::reduce) is a plain function over snapshots
//! - **Watch + events**: snapshots on a `watch` channel, lifecycle as [`BingoEvent`]s
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), bingo_live_client::BingoClientError> {
//! use bingo_live_client::{BingoEvent, ClientConfig, GameConnection, WebSocketConnector};
//!
//! let (mut conn, mut events) =
//!     GameConnection::new(WebSocketConnector::new(), ClientConfig::from_env());
//! conn.open(10, "identity-token").await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let BingoEvent::SessionInvalid = event {
//!         break;
//!     }
//!     println!("phase: {}", conn.snapshot().phase);
//! }
//! conn.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod close_codes;
pub mod connection;
pub mod countdown;
pub mod error;
pub mod event;
pub mod keepalive;
pub mod protocol;
pub mod reducer;
pub mod room;
pub mod round;
pub mod transport;
pub mod transports;

pub use client::{ClientConfig, GameConnection, GameSession};
pub use close_codes::CloseCode;
pub use connection::{ConnectionStatus, RetryPolicy};
pub use error::BingoClientError;
pub use event::BingoEvent;
pub use protocol::{ClientMessage, ServerMessage};
pub use round::{BingoCard, Phase, RoundSnapshot, WinnerRecord};
pub use transport::{Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};

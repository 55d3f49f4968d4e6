//! # Loopback Round Example
//!
//! Implements [`Connector`] and [`Transport`] over in-process channels and
//! plays a short scripted round against the client. No server needed.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_round --no-default-features
//! ```

use async_trait::async_trait;
use bingo_live_client::{
    BingoClientError, BingoEvent, ClientConfig, Connector, GameSession, Phase, Transport,
};
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use url::Url;

// ─────────────────────────────────────────────────────────────────────
// A channel-backed transport
// ─────────────────────────────────────────────────────────────────────

pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// The server side of the loopback.
pub struct LoopbackServer {
    pub rx: mpsc::UnboundedReceiver<String>,
    pub tx: mpsc::UnboundedSender<String>,
}

fn loopback_pair() -> (LoopbackTransport, LoopbackServer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        },
        LoopbackServer {
            rx: server_rx,
            tx: server_tx,
        },
    )
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), BingoClientError> {
        self.tx
            .send(message)
            .map_err(|e| BingoClientError::TransportSend(e.to_string()))
    }

    /// `None` once the server half is dropped.
    async fn recv(&mut self) -> Option<Result<String, BingoClientError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), BingoClientError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// A connector that hands out one prepared transport
// ─────────────────────────────────────────────────────────────────────

struct LoopbackConnector {
    transport: Mutex<Option<LoopbackTransport>>,
}

#[async_trait]
impl Connector for LoopbackConnector {
    type Transport = LoopbackTransport;

    async fn connect(&self, url: &Url) -> Result<LoopbackTransport, BingoClientError> {
        tracing::info!("Loopback connect to {url}");
        self.transport
            .lock()
            .await
            .take()
            .ok_or(BingoClientError::TransportClosed)
    }
}

fn envelope(kind: &str, payload: serde_json::Value) -> String {
    json!({ "type": kind, "payload": payload }).to_string()
}

fn epoch_millis() -> i64 {
    bingo_live_client::countdown::epoch_millis()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (transport, mut server) = loopback_pair();
    let connector = LoopbackConnector {
        transport: Mutex::new(Some(transport)),
    };
    let (mut session, mut events) =
        GameSession::start(connector, ClientConfig::new("ws://loopback/ws"), 10, "demo")?;

    // ── Fake server: the first frame is always join_room ────────────
    let Some(join) = server.rx.recv().await else {
        return Err("client hung up before joining".into());
    };
    tracing::info!("Server received: {join}");

    server.tx.send(envelope(
        "registration_open",
        json!({ "gameId": "demo-1", "endsAt": epoch_millis() + 30_000, "takenCards": [3] }),
    ))?;

    while let Some(event) = events.recv().await {
        tracing::info!("Event: {event:?}");
        let BingoEvent::PhaseChanged { to, .. } = event else {
            continue;
        };
        match to {
            Phase::Registration => {
                session.select_card(7);
                if let Some(pick) = server.rx.recv().await {
                    tracing::info!("Server received: {pick}");
                }
                server.tx.send(envelope(
                    "selection_confirmed",
                    json!({ "cardNumber": 7, "playersCount": 1 }),
                ))?;
                server.tx.send(envelope(
                    "game_started",
                    json!({
                        "gameId": "demo-1",
                        "cardNumber": 7,
                        "card": [
                            [1, 16, 31, 46, 61],
                            [2, 17, 32, 47, 62],
                            [3, 18, 0, 48, 63],
                            [4, 19, 33, 49, 64],
                            [5, 20, 34, 50, 65]
                        ]
                    }),
                ))?;
            }
            Phase::Running => {
                for number in [1, 2, 3, 4, 5] {
                    server
                        .tx
                        .send(envelope("number_called", json!({ "number": number })))?;
                }
                server.tx.send(envelope(
                    "bingo_accepted",
                    json!({ "winners": [{ "cardNumber": 7, "prize": 9 }] }),
                ))?;
            }
            Phase::Announce => {
                let snapshot = session.snapshot();
                tracing::info!(
                    "Called {:?}, winning line {:?}",
                    snapshot.called_numbers,
                    snapshot
                        .your_card
                        .as_ref()
                        .and_then(|card| card.winning_line(&snapshot.called_numbers))
                );
                break;
            }
            _ => {}
        }
    }

    session.close().await;
    tracing::info!("Done");
    Ok(())
}

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for bingo live client integration tests.
//!
//! [`MockConnector`] hands out scripted connection outcomes in order. Each
//! accepted connection yields a [`ServerHandle`] that plays the server side:
//! push envelopes, close with a code, and read what the client sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use bingo_live_client::{
    BingoClientError, BingoEvent, ClientMessage, CloseCode, Connector, RoundSnapshot, Transport,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

// ── MockTransport ───────────────────────────────────────────────────

enum Frame {
    Text(String),
    Close(u16),
    Error(String),
}

/// A channel-based transport driven by a [`ServerHandle`].
pub struct MockTransport {
    frames: mpsc::UnboundedReceiver<Frame>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
    fail_send: Arc<AtomicBool>,
    close_code: Option<CloseCode>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), BingoClientError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BingoClientError::TransportClosed);
        }
        if self.fail_send.swap(false, Ordering::AcqRel) {
            return Err(BingoClientError::TransportSend("broken pipe".into()));
        }
        self.outbound
            .send(message)
            .map_err(|e| BingoClientError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, BingoClientError>> {
        match self.frames.recv().await {
            Some(Frame::Text(text)) => Some(Ok(text)),
            Some(Frame::Close(code)) => {
                self.close_code = Some(CloseCode::from(code));
                None
            }
            Some(Frame::Error(reason)) => Some(Err(BingoClientError::TransportReceive(reason))),
            // Server handle dropped: keep the connection idle.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), BingoClientError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn close_code(&self) -> Option<CloseCode> {
        self.close_code
    }
}

/// The server side of one accepted [`MockTransport`].
pub struct ServerHandle {
    frames: mpsc::UnboundedSender<Frame>,
    outbound: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
    fail_send: Arc<AtomicBool>,
}

impl ServerHandle {
    pub fn push(&self, json: impl Into<String>) {
        let _ = self.frames.send(Frame::Text(json.into()));
    }

    pub fn close_with(&self, code: u16) {
        let _ = self.frames.send(Frame::Close(code));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self.frames.send(Frame::Error(reason.to_owned()));
    }

    /// Make the client's next send on this connection fail.
    pub fn fail_next_send(&self) {
        self.fail_send.store(true, Ordering::Release);
    }

    /// Next message the client sent on this connection.
    pub async fn next_sent(&mut self) -> ClientMessage {
        let raw = tokio::time::timeout(WAIT, self.outbound.recv())
            .await
            .expect("timed out waiting for a client message")
            .expect("client transport dropped");
        serde_json::from_str(&raw).expect("client sent an invalid envelope")
    }

    /// A message already sent by the client, without waiting.
    pub fn try_next_sent(&mut self) -> Option<ClientMessage> {
        self.outbound
            .try_recv()
            .ok()
            .map(|raw| serde_json::from_str(&raw).expect("client sent an invalid envelope"))
    }

    /// Whether the client closed this transport.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn mock_pair() -> (MockTransport, ServerHandle) {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    let fail_send = Arc::new(AtomicBool::new(false));
    let transport = MockTransport {
        frames: frames_rx,
        outbound: outbound_tx,
        closed: Arc::clone(&closed),
        fail_send: Arc::clone(&fail_send),
        close_code: None,
    };
    let server = ServerHandle {
        frames: frames_tx,
        outbound: outbound_rx,
        closed,
        fail_send,
    };
    (transport, server)
}

// ── MockConnector ───────────────────────────────────────────────────

enum Outcome {
    Accept(MockTransport),
    Refuse,
    RejectToken,
}

/// One call to [`Connector::connect`].
#[derive(Debug, Clone)]
pub struct Attempt {
    pub at: Instant,
    pub url: Url,
}

#[derive(Default)]
struct ConnectorState {
    script: VecDeque<Outcome>,
    attempts: Vec<Attempt>,
}

/// A connector that plays back scripted outcomes. Once the script runs out,
/// connection attempts never complete.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<StdMutex<ConnectorState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful connection and return its server side.
    pub fn accept(&self) -> ServerHandle {
        let (transport, server) = mock_pair();
        self.state
            .lock()
            .unwrap()
            .script
            .push_back(Outcome::Accept(transport));
        server
    }

    /// Queue a connection that fails with an I/O error.
    pub fn refuse(&self) {
        self.state.lock().unwrap().script.push_back(Outcome::Refuse);
    }

    /// Queue a connection refused because of the identity token.
    pub fn reject_token(&self) {
        self.state
            .lock()
            .unwrap()
            .script
            .push_back(Outcome::RejectToken);
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.state.lock().unwrap().attempts.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, url: &Url) -> Result<MockTransport, BingoClientError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.attempts.push(Attempt {
                at: Instant::now(),
                url: url.clone(),
            });
            state.script.pop_front()
        };
        match outcome {
            Some(Outcome::Accept(transport)) => Ok(transport),
            Some(Outcome::Refuse) => Err(BingoClientError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Some(Outcome::RejectToken) => Err(BingoClientError::Unauthorized),
            None => std::future::pending().await,
        }
    }
}

// ── Event helpers ───────────────────────────────────────────────────

pub async fn next_event(events: &mut mpsc::Receiver<BingoEvent>) -> BingoEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Skip events until one matches `pred`.
pub async fn wait_for_event<F>(events: &mut mpsc::Receiver<BingoEvent>, pred: F) -> BingoEvent
where
    F: Fn(&BingoEvent) -> bool,
{
    loop {
        let event = next_event(events).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Wait until the published snapshot satisfies `pred`.
pub async fn wait_snapshot<F>(rx: &mut watch::Receiver<RoundSnapshot>, pred: F) -> RoundSnapshot
where
    F: FnMut(&RoundSnapshot) -> bool,
{
    let current = tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("snapshot sender dropped");
    RoundSnapshot::clone(&current)
}

// ── JSON helpers ────────────────────────────────────────────────────

pub fn envelope(kind: &str, payload: Value) -> String {
    json!({ "type": kind, "payload": payload }).to_string()
}

pub fn sample_card() -> Value {
    json!([
        [1, 16, 31, 46, 61],
        [2, 17, 32, 47, 62],
        [3, 18, 0, 48, 63],
        [4, 19, 33, 49, 64],
        [5, 20, 34, 50, 65]
    ])
}

pub fn registration_open_json(game_id: &str, ends_at: i64) -> String {
    envelope(
        "registration_open",
        json!({ "endsAt": ends_at, "gameId": game_id, "playersCount": 0, "takenCards": [] }),
    )
}

pub fn registration_update_json(taken: &[u32], prize_pool: u64) -> String {
    envelope(
        "registration_update",
        json!({ "takenCards": taken, "prizePool": prize_pool }),
    )
}

pub fn selection_confirmed_json(card_number: u32, players: u32) -> String {
    envelope(
        "selection_confirmed",
        json!({ "cardNumber": card_number, "playersCount": players }),
    )
}

pub fn selection_rejected_json(reason: &str) -> String {
    envelope("selection_rejected", json!({ "reason": reason }))
}

pub fn game_started_json(game_id: &str, card_number: Option<u32>) -> String {
    let payload = match card_number {
        Some(number) => json!({ "gameId": game_id, "card": sample_card(), "cardNumber": number }),
        None => json!({ "gameId": game_id }),
    };
    envelope("game_started", payload)
}

pub fn number_called_json(number: u8, called: &[u8]) -> String {
    envelope(
        "number_called",
        json!({ "number": number, "calledNumbers": called }),
    )
}

pub fn bingo_accepted_json(card_number: u32, prize: u64) -> String {
    envelope(
        "bingo_accepted",
        json!({ "winners": [{ "cardNumber": card_number, "prize": prize }] }),
    )
}

pub fn snapshot_json(game_id: &str, phase: &str, called: &[u8]) -> String {
    envelope(
        "snapshot",
        json!({
            "phase": phase,
            "gameId": game_id,
            "playersCount": 3,
            "prizePool": 30,
            "calledNumbers": called,
            "takenCards": [],
        }),
    )
}

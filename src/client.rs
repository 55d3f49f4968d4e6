//! Async client for a live bingo round.
//!
//! [`GameSession`] is one connection handle scoped to a (stake, token) pair.
//! It owns a background task that drives the connection state machine:
//! connect, declare the room, keep the link alive, fold server messages into
//! the [`RoundSnapshot`], and reconnect with backoff when the link drops.
//!
//! [`GameConnection`] owns at most one session at a time and replaces it when
//! the stake or token changes.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env();
//! let (mut conn, mut events) = GameConnection::new(WebSocketConnector::new(), config);
//! conn.open(10, token).await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         BingoEvent::PhaseChanged { to: Phase::Registration, .. } => {
//!             conn.select_card(7);
//!         }
//!         BingoEvent::SessionInvalid => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::connection::{session_url, ConnectionState, ConnectionStatus, Disconnect, RetryPolicy};
use crate::countdown::{self, epoch_millis};
use crate::error::{BingoClientError, Result};
use crate::event::BingoEvent;
use crate::keepalive::{Keepalive, DEFAULT_KEEPALIVE_INTERVAL};
use crate::protocol::{decode_server_message, ClientMessage, Inbound, ServerMessage};
use crate::reducer::{reduce, Reduction};
use crate::room::RoomMembership;
use crate::round::{Phase, RoundSnapshot};
use crate::transport::{Connector, Transport};

/// Environment variable read by [`ClientConfig::from_env`].
pub const ENDPOINT_ENV_VAR: &str = "BINGO_WS_URL";

/// Endpoint used when [`ENDPOINT_ENV_VAR`] is not set.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:3001/ws";

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`GameSession`].
///
/// # Example
///
/// ```
/// use bingo_live_client::client::ClientConfig;
/// use bingo_live_client::connection::RetryPolicy;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("wss://bingo.example/ws")
///     .with_retry_policy(RetryPolicy::card_selection())
///     .with_shutdown_timeout(Duration::from_secs(2));
/// assert_eq!(config.keepalive_interval, Duration::from_secs(20));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint without query parameters.
    pub endpoint: String,
    /// Reconnect policy. Defaults to [`RetryPolicy::game`].
    pub retry_policy: RetryPolicy,
    /// Keepalive period. Defaults to **20 seconds**.
    pub keepalive_interval: Duration,
    /// Countdown recompute period. Defaults to **1 second**.
    pub countdown_interval: Duration,
    /// A connection attempt taking longer than this is a transport fault.
    /// Defaults to **10 seconds**.
    pub connect_timeout: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, transient events are dropped with a
    /// warning. `Disconnected`, `SessionInvalid` and `RetriesExhausted` are
    /// always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Time [`GameSession::close`] waits for the task before aborting it.
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for `endpoint` with default values.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            retry_policy: RetryPolicy::game(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            countdown_interval: DEFAULT_COUNTDOWN_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Read the endpoint from `BINGO_WS_URL`, falling back to
    /// `ws://localhost:3001/ws`.
    pub fn from_env() -> Self {
        Self::from_endpoint_var(std::env::var(ENDPOINT_ENV_VAR).ok())
    }

    fn from_endpoint_var(value: Option<String>) -> Self {
        let endpoint = value
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        Self::new(endpoint)
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    #[must_use]
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Values below one millisecond are clamped.
    #[must_use]
    pub fn with_countdown_interval(mut self, interval: Duration) -> Self {
        self.countdown_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// A zero timeout aborts the session task immediately on close.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

// ── Session handle ──────────────────────────────────────────────────

/// One connection handle for a (stake, token) pair.
///
/// Created via [`GameSession::start`]. Dropping the handle aborts the task;
/// call [`close`](Self::close) for an orderly teardown.
pub struct GameSession {
    stake: u64,
    token: String,
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    snapshot_tx: Arc<watch::Sender<RoundSnapshot>>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl GameSession {
    /// Start a session task and return its handle plus the event receiver.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BingoClientError::InvalidEndpoint`] if the configured endpoint
    /// is not a valid URL.
    pub fn start<C: Connector>(
        connector: C,
        config: ClientConfig,
        stake: u64,
        token: impl Into<String>,
    ) -> Result<(Self, mpsc::Receiver<BingoEvent>)> {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let session = Self::spawn(Arc::new(connector), &config, stake, token.into(), event_tx)?;
        Ok((session, event_rx))
    }

    pub(crate) fn spawn<C: Connector>(
        connector: Arc<C>,
        config: &ClientConfig,
        stake: u64,
        token: String,
        event_tx: mpsc::Sender<BingoEvent>,
    ) -> Result<Self> {
        let url = session_url(&config.endpoint, &token, stake)?;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (status_tx, _) = watch::channel(ConnectionStatus::Idle);
        let (snapshot_tx, _) = watch::channel(RoundSnapshot::default());
        let status_tx = Arc::new(status_tx);
        let snapshot_tx = Arc::new(snapshot_tx);

        let actor = SessionActor {
            connector,
            url,
            stake,
            retry_policy: config.retry_policy,
            connect_timeout: config.connect_timeout,
            countdown_interval: config.countdown_interval,
            keepalive: Keepalive::new(config.keepalive_interval),
            state: ConnectionState::Idle,
            room: RoomMembership::new(stake),
            cmd_rx,
            event_tx,
            status_tx: Arc::clone(&status_tx),
            snapshot_tx: Arc::clone(&snapshot_tx),
            shutdown_rx,
        };
        let task = tokio::spawn(actor.run());

        Ok(Self {
            stake,
            token,
            cmd_tx,
            status_tx,
            snapshot_tx,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    pub fn stake(&self) -> u64 {
        self.stake
    }

    /// Current round snapshot.
    pub fn snapshot(&self) -> RoundSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver notified on every snapshot change.
    pub fn subscribe_snapshot(&self) -> watch::Receiver<RoundSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_open()
    }

    // ── Action gateway ──────────────────────────────────────────────

    /// Register for the current round with `card_number`.
    ///
    /// Returns `false` without sending anything unless connected during
    /// registration. `true` only means the intent was queued; the outcome
    /// arrives as `selection_confirmed` or a
    /// [`SelectionRejected`](BingoEvent::SelectionRejected) event.
    pub fn select_card(&self, card_number: u32) -> bool {
        self.send_gated(ClientMessage::SelectCard { card_number }, Phase::Registration)
    }

    /// Claim a bingo. Same contract as [`select_card`](Self::select_card),
    /// gated on the `running` phase.
    pub fn claim_bingo(&self) -> bool {
        self.send_gated(ClientMessage::BingoClaim {}, Phase::Running)
    }

    fn send_gated(&self, message: ClientMessage, required: Phase) -> bool {
        let status = self.status();
        let phase = self.snapshot_tx.borrow().phase;
        if !status.is_open() || phase != required {
            debug!(
                kind = message.kind(),
                %status,
                %phase,
                "refusing action outside its phase"
            );
            return false;
        }
        self.cmd_tx.send(message).is_ok()
    }

    // ── Teardown ────────────────────────────────────────────────────

    /// Stop retrying, cancel timers, close the transport and discard the
    /// snapshot, in that order. Safe to call more than once.
    pub async fn close(&mut self) {
        debug!(stake = self.stake, "session close requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session task terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session task did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session task aborted: {join_err}");
                    }
                }
            }
        }

        // Covers a task that was aborted or had already stopped.
        self.status_tx.send_if_modified(|status| {
            if status.is_terminal() {
                false
            } else {
                *status = ConnectionStatus::Closed;
                true
            }
        });
        self.snapshot_tx.send_replace(RoundSnapshot::default());
    }

    fn matches(&self, stake: u64, token: &str) -> bool {
        self.stake == stake && self.token == token
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("stake", &self.stake)
            .field("status", &self.status())
            .field("has_task", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        // No executor to drive a graceful close here.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Stake-switching owner ───────────────────────────────────────────

/// Owns the session for the currently selected stake.
///
/// All sessions opened through one `GameConnection` report on the same event
/// channel.
pub struct GameConnection<C: Connector> {
    connector: Arc<C>,
    config: ClientConfig,
    event_tx: mpsc::Sender<BingoEvent>,
    session: Option<GameSession>,
    idle_status: ConnectionStatus,
}

impl<C: Connector> GameConnection<C> {
    #[must_use = "the event receiver must be used to receive events"]
    pub fn new(connector: C, config: ClientConfig) -> (Self, mpsc::Receiver<BingoEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let connection = Self {
            connector: Arc::new(connector),
            config,
            event_tx,
            session: None,
            idle_status: ConnectionStatus::Idle,
        };
        (connection, event_rx)
    }

    /// Open a session for `stake` using the identity `token`.
    ///
    /// A no-op while a live session for the same (stake, token) exists. Any
    /// other session is closed first. After `SessionInvalid` or
    /// `RetriesExhausted`, calling `open` again starts a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`BingoClientError::InvalidEndpoint`] if the configured endpoint
    /// is not a valid URL.
    pub async fn open(&mut self, stake: u64, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if let Some(session) = &self.session {
            if session.matches(stake, &token) && !session.status().is_terminal() {
                debug!(stake, "session already open");
                return Ok(());
            }
        }
        if let Some(mut previous) = self.session.take() {
            info!(
                from = previous.stake(),
                to = stake,
                "replacing game session"
            );
            previous.close().await;
        }
        let session = GameSession::spawn(
            Arc::clone(&self.connector),
            &self.config,
            stake,
            token,
            self.event_tx.clone(),
        )?;
        self.session = Some(session);
        Ok(())
    }

    /// Tear down the current session. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            self.idle_status = ConnectionStatus::Closed;
        }
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    /// Snapshot of the current session, or an empty one.
    pub fn snapshot(&self) -> RoundSnapshot {
        self.session
            .as_ref()
            .map(GameSession::snapshot)
            .unwrap_or_default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.session
            .as_ref()
            .map_or(self.idle_status, GameSession::status)
    }

    /// See [`GameSession::select_card`].
    pub fn select_card(&self, card_number: u32) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.select_card(card_number))
    }

    /// See [`GameSession::claim_bingo`].
    pub fn claim_bingo(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(GameSession::claim_bingo)
    }
}

impl<C: Connector> std::fmt::Debug for GameConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameConnection")
            .field("endpoint", &self.config.endpoint)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ── Session task ────────────────────────────────────────────────────

enum Connect<T> {
    Open(T),
    Failed(Disconnect),
    Shutdown,
}

enum Served<T> {
    Lost(Disconnect),
    Shutdown(T),
}

struct SessionActor<C: Connector> {
    connector: Arc<C>,
    url: Url,
    stake: u64,
    retry_policy: RetryPolicy,
    connect_timeout: Duration,
    countdown_interval: Duration,
    keepalive: Keepalive,
    state: ConnectionState,
    room: RoomMembership,
    cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<BingoEvent>,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    snapshot_tx: Arc<watch::Sender<RoundSnapshot>>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl<C: Connector> SessionActor<C> {
    async fn run(mut self) {
        debug!(stake = self.stake, "session task started");
        let mut countdown = tokio::time::interval(self.countdown_interval);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.set_state(self.state.start());
        loop {
            let state = self.state;
            match state {
                ConnectionState::Connecting { retry } => {
                    match self.connect(retry, &mut countdown).await {
                        Connect::Open(transport) => match self.serve(transport, &mut countdown).await {
                            Served::Lost(disconnect) => self.lost(disconnect).await,
                            Served::Shutdown(transport) => {
                                self.shutdown(countdown, Some(transport)).await;
                                return;
                            }
                        },
                        Connect::Failed(disconnect) => self.lost(disconnect).await,
                        Connect::Shutdown => {
                            self.shutdown(countdown, None).await;
                            return;
                        }
                    }
                }
                ConnectionState::Backoff { delay, .. } => {
                    if !self.wait_backoff(delay, &mut countdown).await {
                        self.shutdown(countdown, None).await;
                        return;
                    }
                    self.set_state(self.state.backoff_elapsed());
                }
                other => {
                    debug!(state = ?other, "session task stopping");
                    break;
                }
            }
        }
        debug!(stake = self.stake, "session task exited");
    }

    /// One connection attempt. Countdown ticks keep running meanwhile.
    async fn connect(&mut self, retry: u32, countdown: &mut Interval) -> Connect<C::Transport> {
        info!(stake = self.stake, retry, "connecting to game server");
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let timeout = self.connect_timeout;
        let attempt =
            async move { tokio::time::timeout(timeout, connector.connect(&url)).await };
        tokio::pin!(attempt);

        loop {
            let countdown_active = self.countdown_active();
            tokio::select! {
                _ = &mut self.shutdown_rx => return Connect::Shutdown,
                result = &mut attempt => {
                    return match result {
                        Ok(Ok(transport)) => Connect::Open(transport),
                        Ok(Err(e)) => {
                            warn!(stake = self.stake, error = %e, "connection attempt failed");
                            Connect::Failed(Disconnect::from_error(&e))
                        }
                        Err(_) => {
                            warn!(stake = self.stake, "connection attempt timed out");
                            Connect::Failed(Disconnect::from_error(&BingoClientError::Timeout))
                        }
                    };
                }
                cmd = self.cmd_rx.recv() => {
                    if !discard_offline(cmd) {
                        return Connect::Shutdown;
                    }
                }
                _ = countdown.tick(), if countdown_active => self.tick_countdown(),
            }
        }
    }

    /// Drive an open transport until it drops or the session is closed.
    async fn serve(
        &mut self,
        mut transport: C::Transport,
        countdown: &mut Interval,
    ) -> Served<C::Transport> {
        while let Ok(stale) = self.cmd_rx.try_recv() {
            debug!(kind = stale.kind(), "discarding intent queued before connection opened");
        }

        self.set_state(self.state.connected());
        info!(stake = self.stake, "connected to game server");
        self.emit(BingoEvent::Connected { stake: self.stake });

        if let Some(join) = self.room.join_message() {
            if let Err(e) = send_message(&mut transport, &join).await {
                warn!(stake = self.stake, error = %e, "join_room send failed; retrying on reconnect");
                return Served::Lost(Disconnect::new(transport.close_code(), e.to_string()));
            }
            self.room.confirm_sent();
            debug!(stake = self.stake, "room membership declared");
        }

        let mut keepalive = self.keepalive.start();

        loop {
            let countdown_active = self.countdown_active();
            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    return Served::Shutdown(transport);
                }

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(msg) => {
                        if let Err(e) = send_message(&mut transport, &msg).await {
                            error!(kind = msg.kind(), error = %e, "transport send error");
                            return Served::Lost(Disconnect::new(transport.close_code(), e.to_string()));
                        }
                    }
                    None => return Served::Shutdown(transport),
                },

                incoming = transport.recv() => match incoming {
                    Some(Ok(text)) => self.handle_text(&text),
                    Some(Err(e)) => {
                        error!(error = %e, "transport receive error");
                        return Served::Lost(Disconnect::new(transport.close_code(), e.to_string()));
                    }
                    None => {
                        let code = transport.close_code();
                        debug!(code = code.map(|c| c.as_u16()), "transport closed by server");
                        return Served::Lost(Disconnect::new(code, "connection closed by server"));
                    }
                },

                _ = keepalive.tick() => {
                    let ping = Keepalive::ping(epoch_millis());
                    if let Err(e) = send_message(&mut transport, &ping).await {
                        warn!(error = %e, "keepalive send failed");
                        return Served::Lost(Disconnect::new(transport.close_code(), e.to_string()));
                    }
                }

                _ = countdown.tick(), if countdown_active => self.tick_countdown(),
            }
        }
    }

    /// Wait out a backoff delay. Returns `false` if the session was closed.
    async fn wait_backoff(&mut self, delay: Duration, countdown: &mut Interval) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            let countdown_active = self.countdown_active();
            tokio::select! {
                _ = &mut self.shutdown_rx => return false,
                () = &mut sleep => return true,
                cmd = self.cmd_rx.recv() => {
                    if !discard_offline(cmd) {
                        return false;
                    }
                }
                _ = countdown.tick(), if countdown_active => self.tick_countdown(),
            }
        }
    }

    async fn lost(&mut self, disconnect: Disconnect) {
        self.room.reset();
        if self.state == ConnectionState::Open {
            info!(
                stake = self.stake,
                code = disconnect.code.map(|c| c.as_u16()),
                reason = %disconnect.reason,
                "disconnected from game server"
            );
            self.emit_critical(BingoEvent::Disconnected {
                code: disconnect.code,
                reason: disconnect.reason.clone(),
            })
            .await;
        }

        let next = self.state.lost(&disconnect, &self.retry_policy);
        self.set_state(next);
        match next {
            ConnectionState::Backoff { retry, delay } => {
                info!(
                    stake = self.stake,
                    attempt = retry,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "reconnect scheduled"
                );
                self.emit(BingoEvent::ReconnectScheduled {
                    attempt: retry,
                    delay,
                });
            }
            ConnectionState::Fatal => {
                warn!(stake = self.stake, "identity token rejected; not reconnecting");
                self.emit_critical(BingoEvent::SessionInvalid).await;
            }
            ConnectionState::Exhausted { attempts } => {
                warn!(stake = self.stake, attempts, "reconnect attempts exhausted");
                self.emit_critical(BingoEvent::RetriesExhausted { attempts })
                    .await;
            }
            _ => {}
        }
    }

    async fn shutdown(mut self, countdown: Interval, transport: Option<C::Transport>) {
        let was_open = self.state == ConnectionState::Open;
        self.set_state(self.state.close());
        drop(countdown);
        if let Some(mut transport) = transport {
            if let Err(e) = transport.close().await {
                debug!("transport close failed: {e}");
            }
        }
        self.snapshot_tx.send_replace(RoundSnapshot::default());
        if was_open {
            self.emit_critical(BingoEvent::Disconnected {
                code: None,
                reason: "client closed".to_owned(),
            })
            .await;
        }
        debug!(stake = self.stake, "session task closed");
    }

    // ── Snapshot updates ────────────────────────────────────────────

    fn countdown_active(&self) -> bool {
        countdown::is_active(&self.snapshot_tx.borrow())
    }

    fn handle_text(&self, text: &str) {
        match decode_server_message(text) {
            Ok(Inbound::Message(msg)) => self.apply(&msg),
            Ok(Inbound::Unknown(kind)) => {
                debug!(kind = %kind, "ignoring unknown server message");
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed server message");
            }
        }
    }

    fn apply(&self, msg: &ServerMessage) {
        let prev = self.snapshot_tx.borrow().clone();
        let Reduction { snapshot, notice } = reduce(&prev, msg, epoch_millis());
        self.publish(prev.phase, snapshot);
        if let Some(notice) = notice {
            self.emit(notice.into());
        }
    }

    fn tick_countdown(&self) {
        let prev = self.snapshot_tx.borrow().clone();
        if let Some(next) = countdown::tick(&prev, epoch_millis()) {
            if next.phase != prev.phase {
                debug!("registration deadline reached");
            }
            self.publish(prev.phase, next);
        }
    }

    fn publish(&self, from: Phase, snapshot: RoundSnapshot) {
        let to = snapshot.phase;
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        if from != to {
            info!(stake = self.stake, %from, %to, "phase changed");
            self.emit(BingoEvent::PhaseChanged { from, to });
        }
    }

    // ── Events ──────────────────────────────────────────────────────

    fn set_state(&mut self, next: ConnectionState) {
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "connection state");
        }
        self.state = next;
        self.status_tx.send_replace(next.status());
    }

    /// Drops the event with a warning when the channel is full.
    fn emit(&self, event: BingoEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("event channel full, dropping event: {dropped:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event channel closed, receiver dropped");
            }
        }
    }

    /// For events that must never be dropped.
    async fn emit_critical(&self, event: BingoEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Drops an intent that arrived while no transport is open. Returns `false`
/// when the command channel has closed.
fn discard_offline(cmd: Option<ClientMessage>) -> bool {
    match cmd {
        Some(msg) => {
            debug!(kind = msg.kind(), "discarding intent while disconnected");
            true
        }
        None => false,
    }
}

async fn send_message<T: Transport>(transport: &mut T, message: &ClientMessage) -> Result<()> {
    let json = serde_json::to_string(message)?;
    debug!(kind = message.kind(), "sending client message");
    transport.send(json).await
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
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

    #[test]
    fn config_defaults() {
        let config = ClientConfig::new("ws://example/ws");
        assert_eq!(config.endpoint, "ws://example/ws");
        assert_eq!(config.retry_policy, RetryPolicy::game());
        assert_eq!(config.keepalive_interval, Duration::from_secs(20));
        assert_eq!(config.countdown_interval, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn config_clamps_values() {
        let config = ClientConfig::default()
            .with_event_channel_capacity(0)
            .with_countdown_interval(Duration::ZERO);
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.countdown_interval, Duration::from_millis(1));
    }

    #[test]
    fn endpoint_falls_back_to_default() {
        assert_eq!(ClientConfig::from_endpoint_var(None).endpoint, DEFAULT_ENDPOINT);
        assert_eq!(
            ClientConfig::from_endpoint_var(Some("  ".into())).endpoint,
            DEFAULT_ENDPOINT
        );
        assert_eq!(
            ClientConfig::from_endpoint_var(Some("wss://bingo.example/ws".into())).endpoint,
            "wss://bingo.example/ws"
        );
    }

    #[test]
    fn discard_offline_reports_closed_channel() {
        assert!(discard_offline(Some(ClientMessage::BingoClaim {})));
        assert!(!discard_offline(None));
    }
}

//! Liveness Monitor.
//!
//! Sends a `ping` on a fixed period while a connection is open. Failures are
//! detected from transport close events, not from missing `pong` replies.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::protocol::ClientMessage;

/// Keepalive period used by the game server's infrastructure.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    period: Duration,
}

impl Keepalive {
    /// A zero period is raised to one millisecond.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// A fresh timer for one connection. The first tick fires one full
    /// period after the connection opened.
    pub fn start(&self) -> Interval {
        let mut timer = interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    }

    /// The ping message for `now_ms`.
    pub fn ping(now_ms: i64) -> ClientMessage {
        ClientMessage::Ping { ts: Some(now_ms) }
    }
}

impl Default for Keepalive {
    fn default() -> Self {
        Self::new(DEFAULT_KEEPALIVE_INTERVAL)
    }
}

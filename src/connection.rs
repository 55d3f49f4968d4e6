//! Connection Manager state machine.
//!
//! [`ConnectionState`] is a plain value with transition methods; the session
//! task in [`client`](crate::client) drives it and performs the I/O. Only the
//! `Connecting` state ever has a connection attempt in flight, so at most one
//! transport exists per session.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::close_codes::CloseCode;
use crate::error::{BingoClientError, Result};

/// How long to wait between reconnect attempts.
///
/// Delays start at `base` and double each attempt up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry forever.
    Unbounded { base: Duration, max: Duration },
    /// Give up after `max_attempts` reconnects.
    Bounded {
        base: Duration,
        max: Duration,
        max_attempts: u32,
    },
}

impl RetryPolicy {
    /// Policy for the main game connection: unbounded, 1 s doubling to 10 s.
    pub fn game() -> Self {
        Self::Unbounded {
            base: Duration::from_secs(1),
            max: Duration::from_secs(10),
        }
    }

    /// Policy for the pre-round card selection connection: 3 attempts,
    /// 1 s doubling to 5 s.
    pub fn card_selection() -> Self {
        Self::Bounded {
            base: Duration::from_secs(1),
            max: Duration::from_secs(5),
            max_attempts: 3,
        }
    }

    /// Delay before reconnect attempt number `attempt` (1-based), or `None`
    /// when the policy is exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        let (base, max) = match *self {
            Self::Unbounded { base, max } => (base, max),
            Self::Bounded {
                base,
                max,
                max_attempts,
            } => {
                if attempt > max_attempts {
                    return None;
                }
                (base, max)
            }
        };
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = base.saturating_mul(1u32 << exponent);
        Some(delay.min(max))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::game()
    }
}

/// Why a transport went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    /// Close code sent by the server, if a close frame was received.
    pub code: Option<CloseCode>,
    pub reason: String,
}

impl Disconnect {
    pub fn new(code: Option<CloseCode>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Builds a disconnect from a failed connection attempt.
    ///
    /// [`BingoClientError::Unauthorized`] maps to a policy-violation close so it
    /// is handled the same way as a `1008` close.
    pub fn from_error(error: &BingoClientError) -> Self {
        match error {
            BingoClientError::Unauthorized => {
                Self::new(Some(CloseCode::PolicyViolation), error.to_string())
            }
            other => Self::new(None, other.to_string()),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.code.is_some_and(CloseCode::is_auth_failure)
    }
}

/// Externally visible connection status, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Open,
    /// Waiting to reconnect.
    Backoff,
    /// The identity token was rejected. A new token is required.
    Fatal,
    /// The bounded retry policy ran out of attempts.
    Exhausted,
    /// Closed by the caller.
    Closed,
}

impl ConnectionStatus {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Fatal | Self::Exhausted | Self::Closed)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Backoff => "backoff",
            Self::Fatal => "fatal",
            Self::Exhausted => "exhausted",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Connection lifecycle.
///
/// `retry` counts consecutive failed attempts since the last successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting { retry: u32 },
    Open,
    Backoff { retry: u32, delay: Duration },
    Fatal,
    Exhausted { attempts: u32 },
    Closed,
}

impl ConnectionState {
    /// `Idle` → `Connecting`.
    #[must_use]
    pub fn start(self) -> Self {
        match self {
            Self::Idle => Self::Connecting { retry: 0 },
            other => other,
        }
    }

    /// `Connecting` → `Open`. The retry counter is reset.
    #[must_use]
    pub fn connected(self) -> Self {
        match self {
            Self::Connecting { .. } => Self::Open,
            other => other,
        }
    }

    /// The transport closed or a connection attempt failed.
    ///
    /// Auth failures are fatal; anything else schedules a retry under
    /// `policy` or ends in `Exhausted`.
    #[must_use]
    pub fn lost(self, disconnect: &Disconnect, policy: &RetryPolicy) -> Self {
        let retry = match self {
            Self::Open => 0,
            Self::Connecting { retry } => retry,
            other => return other,
        };
        if disconnect.is_auth_failure() {
            return Self::Fatal;
        }
        let attempt = retry.saturating_add(1);
        match policy.delay_for(attempt) {
            Some(delay) => Self::Backoff {
                retry: attempt,
                delay,
            },
            None => Self::Exhausted { attempts: retry },
        }
    }

    /// `Backoff` → `Connecting` once the delay has elapsed.
    #[must_use]
    pub fn backoff_elapsed(self) -> Self {
        match self {
            Self::Backoff { retry, .. } => Self::Connecting { retry },
            other => other,
        }
    }

    /// Any non-terminal state → `Closed`.
    #[must_use]
    pub fn close(self) -> Self {
        match self {
            Self::Fatal | Self::Exhausted { .. } => self,
            _ => Self::Closed,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.status().is_terminal()
    }

    pub fn status(self) -> ConnectionStatus {
        match self {
            Self::Idle => ConnectionStatus::Idle,
            Self::Connecting { .. } => ConnectionStatus::Connecting,
            Self::Open => ConnectionStatus::Open,
            Self::Backoff { .. } => ConnectionStatus::Backoff,
            Self::Fatal => ConnectionStatus::Fatal,
            Self::Exhausted { .. } => ConnectionStatus::Exhausted,
            Self::Closed => ConnectionStatus::Closed,
        }
    }
}

/// Builds the session URL: `endpoint?token=<token>&stake=<stake>`.
///
/// # Errors
///
/// Returns [`BingoClientError::InvalidEndpoint`] if `endpoint` is not a URL.
pub fn session_url(endpoint: &str, token: &str, stake: u64) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut()
        .append_pair("token", token)
        .append_pair("stake", &stake.to_string());
    Ok(url)
}

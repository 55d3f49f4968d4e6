//! WebSocket close codes with defined meaning for the game server.
//!
//! The server signals an invalid or expired identity token by closing the
//! connection with `1008` (policy violation). Every other code is a transport
//! fault and is retried with backoff.

use std::fmt;

/// Close codes the game server is known to send.
///
/// Codes without a dedicated variant are preserved in [`CloseCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// 1000: the server closed the session deliberately.
    Normal,
    /// 1001: the server is shutting down or the endpoint is going away.
    GoingAway,
    /// 1006: the connection dropped without a close frame.
    Abnormal,
    /// 1008: the identity token is invalid or expired.
    PolicyViolation,
    /// 1011: the server hit an internal error.
    InternalError,
    /// 1012: the server is restarting.
    ServiceRestart,
    /// 1013: the server is overloaded.
    TryAgainLater,
    /// Any other code.
    Other(u16),
}

impl CloseCode {
    /// Returns `true` when the close means the session must be re-authenticated.
    ///
    /// No reconnect is attempted for these codes.
    pub fn is_auth_failure(self) -> bool {
        matches!(self, Self::PolicyViolation)
    }

    /// Returns the numeric close code.
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::GoingAway => 1001,
            Self::Abnormal => 1006,
            Self::PolicyViolation => 1008,
            Self::InternalError => 1011,
            Self::ServiceRestart => 1012,
            Self::TryAgainLater => 1013,
            Self::Other(code) => code,
        }
    }

    /// Returns a human-readable description of this close code.
    pub fn description(self) -> &'static str {
        match self {
            Self::Normal => "The server closed the connection normally.",
            Self::GoingAway => "The server is going away. Reconnecting.",
            Self::Abnormal => "The connection was lost without a close handshake. Reconnecting.",
            Self::PolicyViolation => {
                "The identity token is invalid or has expired. Please sign in again."
            }
            Self::InternalError => "The server encountered an internal error. Reconnecting.",
            Self::ServiceRestart => "The server is restarting. Reconnecting.",
            Self::TryAgainLater => "The server is busy. Reconnecting shortly.",
            Self::Other(_) => "The connection was closed. Reconnecting.",
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::GoingAway,
            1006 => Self::Abnormal,
            1008 => Self::PolicyViolation,
            1011 => Self::InternalError,
            1012 => Self::ServiceRestart,
            1013 => Self::TryAgainLater,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_u16(), self.description())
    }
}

//! Events surfaced to the UI.
//!
//! Round state itself is not sent as events; it is published as a
//! [`RoundSnapshot`](crate::round::RoundSnapshot) on a watch channel. Events
//! carry lifecycle changes and transient notices.

use std::time::Duration;

use crate::close_codes::CloseCode;
use crate::reducer::Notice;
use crate::round::Phase;

/// Events emitted by a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BingoEvent {
    /// A transport opened and `join_room` is about to be sent.
    Connected { stake: u64 },
    /// An open transport went away.
    Disconnected {
        code: Option<CloseCode>,
        reason: String,
    },
    /// A reconnect attempt will start after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// The bounded retry policy gave up. Terminal.
    RetriesExhausted { attempts: u32 },
    /// The identity token was rejected. Terminal; re-authenticate and open again.
    SessionInvalid,
    /// The round phase changed, from a server message or the local countdown.
    PhaseChanged { from: Phase, to: Phase },
    /// The server refused a card pick. Transient.
    SelectionRejected { reason: String },
    /// The server sent an error notice. Transient.
    ServerNotice { message: String },
}

impl BingoEvent {
    /// Returns `true` for events after which the session task has stopped.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. } | Self::SessionInvalid)
    }
}

impl From<Notice> for BingoEvent {
    fn from(notice: Notice) -> Self {
        match notice {
            Notice::SelectionRejected { reason } => Self::SelectionRejected { reason },
            Notice::ServerError { message } => Self::ServerNotice { message },
        }
    }
}

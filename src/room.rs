//! Room Protocol Handler.
//!
//! The server forgets room membership when a connection drops, so `join_room`
//! is declared once per connection, before any other outbound message.

use crate::protocol::ClientMessage;

/// Tracks whether the current connection has declared its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomMembership {
    stake: u64,
    declared: bool,
}

impl RoomMembership {
    pub fn new(stake: u64) -> Self {
        Self {
            stake,
            declared: false,
        }
    }

    /// The join message to send, or `None` if already declared on this connection.
    pub fn join_message(&self) -> Option<ClientMessage> {
        (!self.declared).then_some(ClientMessage::JoinRoom { stake: self.stake })
    }

    /// Marks membership declared after the join message was written.
    pub fn confirm_sent(&mut self) {
        self.declared = true;
    }

    /// Forget membership. Called on every disconnect.
    pub fn reset(&mut self) {
        self.declared = false;
    }
}

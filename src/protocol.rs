//! Wire protocol for the bingo game server.
//!
//! Every message in both directions is a JSON envelope
//! `{"type": "<snake_case kind>", "payload": {...}}` with camelCase payload
//! fields. Payload fields are all optional on the way in: a missing field
//! decodes to its default instead of failing the message.
//!
//! Inbound decoding goes through [`decode_server_message`], which separates
//! unknown message kinds ([`Inbound::Unknown`], ignored by the client) from
//! malformed payloads of known kinds (an error, the message is dropped).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::round::{lenient_grid, CardGrid, Phase, WinnerRecord};

// ── Client → server ─────────────────────────────────────────────────

/// Messages sent from the client to the game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Declare membership of the room for `stake`. Sent first on every connection.
    JoinRoom { stake: u64 },
    /// Register for the round with a card number.
    SelectCard {
        #[serde(rename = "cardNumber")]
        card_number: u32,
    },
    /// Claim a bingo on this client's card.
    BingoClaim {},
    /// Keepalive. `ts` is the send time in epoch milliseconds.
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ts: Option<i64>,
    },
}

impl ClientMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::SelectCard { .. } => "select_card",
            Self::BingoClaim {} => "bingo_claim",
            Self::Ping { .. } => "ping",
        }
    }
}

// ── Server → client payloads ────────────────────────────────────────

fn lenient_phase<'de, D>(deserializer: D) -> Result<Option<Phase>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Phase::parse))
}

/// Decodes an explicit `null` as the type's default, the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Full-state sync sent on join and after every reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotPayload {
    /// Unknown phase names decode as `None`.
    #[serde(deserialize_with = "lenient_phase")]
    pub phase: Option<Phase>,
    pub game_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub players_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub prize_pool: u64,
    #[serde(alias = "called", deserialize_with = "null_as_default")]
    pub called_numbers: Vec<u8>,
    #[serde(deserialize_with = "null_as_default")]
    pub taken_cards: Vec<u32>,
    pub your_selection: Option<u32>,
    /// Registration deadline in epoch milliseconds.
    #[serde(alias = "registrationEndTime")]
    pub next_start_at: Option<i64>,
    pub countdown: Option<u32>,
    #[serde(alias = "yourCard", deserialize_with = "lenient_grid")]
    pub card: Option<CardGrid>,
    #[serde(alias = "yourCardNumber")]
    pub card_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationOpenPayload {
    /// Registration deadline in epoch milliseconds.
    pub ends_at: Option<i64>,
    pub game_id: Option<String>,
    pub players_count: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub taken_cards: Vec<u32>,
    pub prize_pool: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationUpdatePayload {
    pub taken_cards: Option<Vec<u32>>,
    pub prize_pool: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStartedPayload {
    pub game_id: Option<String>,
    pub players_count: Option<u32>,
    pub prize_pool: Option<u64>,
    /// Present only when this client registered a card.
    #[serde(deserialize_with = "lenient_grid")]
    pub card: Option<CardGrid>,
    pub card_number: Option<u32>,
    #[serde(alias = "called")]
    pub called_numbers: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumberCalledPayload {
    pub number: Option<u8>,
    /// The server's running list, when sent.
    #[serde(alias = "called")]
    pub called_numbers: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayersUpdatePayload {
    pub players_count: Option<u32>,
    pub prize_pool: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionConfirmedPayload {
    pub card_number: Option<u32>,
    pub players_count: Option<u32>,
    pub prize_pool: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionRejectedPayload {
    pub reason: Option<String>,
    pub card_number: Option<u32>,
}

/// Shared by `bingo_accepted`, `game_finished` and `game_ended`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WinnersPayload {
    #[serde(deserialize_with = "null_as_default")]
    pub winners: Vec<WinnerRecord>,
    #[serde(alias = "called")]
    pub called_numbers: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorPayload {
    pub message: Option<String>,
}

// ── Server → client ─────────────────────────────────────────────────

/// Messages sent from the game server to the client.
///
/// Serializes to the wire envelope. Deserializing an unknown `type` fails;
/// use [`decode_server_message`] to tolerate unknown kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot(SnapshotPayload),
    RegistrationOpen(RegistrationOpenPayload),
    RegistrationClosed,
    RegistrationUpdate(RegistrationUpdatePayload),
    GameStarted(GameStartedPayload),
    NumberCalled(NumberCalledPayload),
    PlayersUpdate(PlayersUpdatePayload),
    SelectionConfirmed(SelectionConfirmedPayload),
    SelectionRejected(SelectionRejectedPayload),
    BingoAccepted(WinnersPayload),
    GameFinished(WinnersPayload),
    GameEnded(WinnersPayload),
    GameCancelled,
    /// Server-side error notice.
    Error(ErrorPayload),
    /// Reply to a keepalive ping.
    Pong,
}

/// Result of decoding one inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A recognized message.
    Message(ServerMessage),
    /// A well-formed envelope of a kind this client does not know.
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

impl ServerMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::RegistrationOpen(_) => "registration_open",
            Self::RegistrationClosed => "registration_closed",
            Self::RegistrationUpdate(_) => "registration_update",
            Self::GameStarted(_) => "game_started",
            Self::NumberCalled(_) => "number_called",
            Self::PlayersUpdate(_) => "players_update",
            Self::SelectionConfirmed(_) => "selection_confirmed",
            Self::SelectionRejected(_) => "selection_rejected",
            Self::BingoAccepted(_) => "bingo_accepted",
            Self::GameFinished(_) => "game_finished",
            Self::GameEnded(_) => "game_ended",
            Self::GameCancelled => "game_cancelled",
            Self::Error(_) => "error",
            Self::Pong => "pong",
        }
    }

    fn from_envelope(envelope: Envelope) -> Result<Inbound, serde_json::Error> {
        let payload = match envelope.payload {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other,
        };
        let message = match envelope.kind.as_str() {
            "snapshot" => Self::Snapshot(serde_json::from_value(payload)?),
            "registration_open" => Self::RegistrationOpen(serde_json::from_value(payload)?),
            "registration_closed" => Self::RegistrationClosed,
            "registration_update" => Self::RegistrationUpdate(serde_json::from_value(payload)?),
            "game_started" => Self::GameStarted(serde_json::from_value(payload)?),
            "number_called" => Self::NumberCalled(serde_json::from_value(payload)?),
            "players_update" => Self::PlayersUpdate(serde_json::from_value(payload)?),
            "selection_confirmed" => Self::SelectionConfirmed(serde_json::from_value(payload)?),
            "selection_rejected" => Self::SelectionRejected(serde_json::from_value(payload)?),
            "bingo_accepted" => Self::BingoAccepted(serde_json::from_value(payload)?),
            "game_finished" => Self::GameFinished(serde_json::from_value(payload)?),
            "game_ended" => Self::GameEnded(serde_json::from_value(payload)?),
            "game_cancelled" => Self::GameCancelled,
            "error" => Self::Error(serde_json::from_value(payload)?),
            "pong" => Self::Pong,
            _ => return Ok(Inbound::Unknown(envelope.kind)),
        };
        Ok(Inbound::Message(message))
    }
}

impl<'de> Deserialize<'de> for ServerMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let envelope = Envelope::deserialize(deserializer)?;
        match ServerMessage::from_envelope(envelope).map_err(D::Error::custom)? {
            Inbound::Message(message) => Ok(message),
            Inbound::Unknown(kind) => Err(D::Error::custom(format!(
                "unknown server message type `{kind}`"
            ))),
        }
    }
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns an error if the text is not a JSON envelope with a string `type`,
/// or if the payload of a known kind does not match its schema.
pub fn decode_server_message(text: &str) -> Result<Inbound, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;
    ServerMessage::from_envelope(envelope)
}

//! Core protocol types for Scrawl's wire format.
//!
//! Every type here gets serialized to JSON, sent over the socket, and
//! deserialized on the other side. Events are internally tagged
//! (`#[serde(tag = "type")]`), which keeps the JSON easy to consume from
//! browser clients.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a single connection.
///
/// This is also the player's identity — the server attaches no meaning to
/// it beyond "the socket that sent this event". Newtype over `u64` so a
/// `ConnectionId` can't be confused with any other numeric id.
///
/// `#[serde(transparent)]` serializes this as a plain number, not
/// `{ "0": 42 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Identifier for a room: a client-chosen string key.
///
/// Rooms are created lazily on first reference, so any string within the
/// length bounds names a valid room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient — who should receive an outbound event?
// ---------------------------------------------------------------------------

/// Specifies which connections in a room should receive a [`ServerEvent`].
///
/// The gateway resolves this against the room's membership; the backplane
/// carries it across instances so siblings can apply the same filter to
/// their own connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every member of the room.
    All,

    /// One specific connection (e.g., the presenter receiving the secret).
    Conn(ConnectionId),

    /// Everyone except the specified connection (e.g., relaying a stroke
    /// to everyone but its author).
    AllExcept(ConnectionId),
}

// ---------------------------------------------------------------------------
// Validation limits
// ---------------------------------------------------------------------------

/// Maximum length of a room id, in characters.
pub const ROOM_ID_MAX_LEN: usize = 50;

/// Maximum length of a display name, in characters.
pub const NAME_MAX_LEN: usize = 30;

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// An event sent by a client.
///
/// `#[serde(tag = "type", rename_all = "snake_case")]` produces JSON like:
/// `{ "type": "join", "room": "r1", "name": "ada" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Enter a room (creating it if it doesn't exist yet).
    Join { room: RoomId, name: String },

    /// Submit a drawing stroke. Only honored from the room's presenter.
    /// The stroke payload is opaque to the server — any JSON object.
    Draw {
        room: RoomId,
        stroke: serde_json::Value,
    },

    /// Guess the secret word.
    Guess { room: RoomId, text: String },

    /// Leave the room explicitly.
    Leave { room: RoomId },
}

impl ClientEvent {
    /// Shape-checks the event before it is allowed to touch room state.
    ///
    /// This is the validation gate: anything that fails here is rejected
    /// back to the sender with a generic message and never reaches the
    /// round logic.
    pub fn validate(&self) -> Result<(), super::ProtocolError> {
        let room = match self {
            Self::Join { room, .. }
            | Self::Draw { room, .. }
            | Self::Guess { room, .. }
            | Self::Leave { room } => room,
        };
        check_len("room", room.as_str(), 1, ROOM_ID_MAX_LEN)?;

        match self {
            Self::Join { name, .. } => {
                check_len("name", name, 1, NAME_MAX_LEN)?;
            }
            Self::Draw { stroke, .. } => {
                if !stroke.is_object() {
                    return Err(super::ProtocolError::InvalidEvent(
                        "stroke must be an object".into(),
                    ));
                }
            }
            Self::Guess { .. } | Self::Leave { .. } => {}
        }
        Ok(())
    }
}

fn check_len(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), super::ProtocolError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(super::ProtocolError::InvalidEvent(format!(
            "{field} must be {min}-{max} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// Public information about one player in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub conn: ConnectionId,
    pub name: String,
    pub score: u32,
}

/// An event sent by the server to one or more connections.
///
/// The secret word appears in exactly one variant, [`RoundStarted`],
/// which the gateway only ever addresses to the presenter's connection.
///
/// [`RoundStarted`]: ServerEvent::RoundStarted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full room snapshot, sent to a connection when it joins. Carries a
    /// secret-present flag instead of the secret itself.
    Snapshot {
        room: RoomId,
        players: Vec<PlayerInfo>,
        strokes: Vec<serde_json::Value>,
        secret_set: bool,
        presenter: Option<ConnectionId>,
    },

    /// Someone else joined the room.
    PlayerJoined { conn: ConnectionId, name: String },

    /// A presenter has been chosen (first join or round rotation).
    PresenterAssigned { conn: ConnectionId, name: String },

    /// The secret for the new round. Presenter-only.
    RoundStarted { secret: String },

    /// A stroke relayed from the presenter. The author renders locally
    /// and does not receive this.
    Draw {
        from: ConnectionId,
        stroke: serde_json::Value,
    },

    /// Outcome of a guess, broadcast to the room whether or not it was
    /// correct. `score` is the guesser's new total, present only on a
    /// correct guess.
    GuessResult {
        conn: ConnectionId,
        name: String,
        text: String,
        correct: bool,
        score: Option<u32>,
    },

    /// The round is over: someone guessed the secret.
    RoundEnded {
        winner: ConnectionId,
        name: String,
        score: u32,
    },

    /// A new round is starting — clients should clear their canvases.
    NewRound,

    /// Someone left the room explicitly.
    PlayerLeft { conn: ConnectionId, name: String },

    /// The sender's last event failed validation. Carries only a
    /// generic message and goes to the offending connection alone.
    Rejected { message: String },
}

// =========================================================================
// Tests
// =========================================================================

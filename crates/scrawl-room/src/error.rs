//! Error types for the room layer.

use scrawl_protocol::{ConnectionId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The connection is already a member of this room.
    #[error("{0} already joined room {1}")]
    AlreadyJoined(ConnectionId, RoomId),

    /// A first presenter was requested for a room that already has one.
    #[error("room {0} already has a presenter")]
    AlreadyStarted(RoomId),
}

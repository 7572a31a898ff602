//! Unified error type for the Scrawl server.

use scrawl_backplane::BackplaneError;
use scrawl_protocol::ProtocolError;
use scrawl_room::RoomError;
use scrawl_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `scrawl` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ScrawlError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (duplicate join, round sequencing).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A backplane-level error (Redis connection, frame codec).
    #[error(transparent)]
    Backplane(#[from] BackplaneError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_protocol::{ConnectionId, RoomId};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let scrawl_err: ScrawlError = err.into();
        assert!(matches!(scrawl_err, ScrawlError::Transport(_)));
        assert!(scrawl_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidEvent("bad".into());
        let scrawl_err: ScrawlError = err.into();
        assert!(matches!(scrawl_err, ScrawlError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::AlreadyJoined(ConnectionId(1), RoomId::from("r1"));
        let scrawl_err: ScrawlError = err.into();
        assert!(matches!(scrawl_err, ScrawlError::Room(_)));
    }
}

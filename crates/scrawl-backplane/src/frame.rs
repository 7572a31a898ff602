//! The wire frame exchanged between instances.

use scrawl_protocol::{Recipient, RoomId, ServerEvent};
use serde::{Deserialize, Serialize};

/// One room-scoped event in flight between instances.
///
/// `origin` is the publishing instance's id; subscribers drop frames that
/// carry their own origin so a published event is never applied twice
/// locally. `recipient` travels with the event so the receiving instance
/// can apply the same addressing filter against its own connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub origin: String,
    pub room: RoomId,
    pub recipient: Recipient,
    pub event: ServerEvent,
}

/// The channel a room's frames are published on.
pub fn channel_for(room: &RoomId) -> String {
    format!("scrawl:room:{room}")
}

/// The pattern every instance subscribes to.
pub const CHANNEL_PATTERN: &str = "scrawl:room:*";

//! Wire protocol for Scrawl.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`Recipient`], the
//!   identity newtypes) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — decode failures and the generic
//!   input-validation rejection.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the gateway
//! (room state). It doesn't know about connections or rooms — it only
//! knows how to serialize, deserialize, and shape-check events.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Gateway (room state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientEvent, ConnectionId, PlayerInfo, Recipient, RoomId, ServerEvent,
    NAME_MAX_LEN, ROOM_ID_MAX_LEN,
};

//! Room state and round logic for Scrawl.
//!
//! This crate owns everything about a single game session that doesn't
//! involve a socket:
//!
//! - [`Room`] — membership (join order), the stroke log, and the
//!   presenter/secret pair
//! - [`RoomRegistry`] — lazy creation and lookup of rooms, disconnect
//!   sweeps, and the opt-in idle reaper
//! - [`round`] — presenter assignment, guess evaluation, and round
//!   rotation (pure logic over a `Room`)
//! - [`WordSource`] — pluggable provider of secret words
//!
//! The registry exclusively owns all `Room` instances; the round logic
//! mutates a room in place but never creates one.

mod error;
mod registry;
mod room;
pub mod round;
mod words;

pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{Player, Room, RoundPhase};
pub use words::{BuiltinWords, WordSource};

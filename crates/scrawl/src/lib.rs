//! # Scrawl
//!
//! Realtime drawing-and-guessing game server.
//!
//! Clients join named rooms over WebSocket; one member per round is the
//! presenter and receives a secret word, everyone else guesses. Strokes
//! relay through the server, correct guesses score and rotate the round.
//! With a Redis backplane configured, multiple instances share rooms'
//! event traffic.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scrawl::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ScrawlError> {
//!     let server = ScrawlServer::builder()
//!         .bind("0.0.0.0:8080")
//!         .build()
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod gateway;
mod handler;
mod server;

pub use error::ScrawlError;
pub use gateway::GatewayConfig;
pub use server::{ScrawlServer, ScrawlServerBuilder};

/// Common imports for building and running a server.
pub mod prelude {
    pub use crate::{
        GatewayConfig, ScrawlError, ScrawlServer, ScrawlServerBuilder,
    };
    pub use scrawl_protocol::{
        ClientEvent, ConnectionId, PlayerInfo, Recipient, RoomId, ServerEvent,
    };
    pub use scrawl_room::{BuiltinWords, WordSource};
}

//! Doodle: a runnable Scrawl server with the built-in word list.
//!
//! Configuration is environment-driven:
//!
//! - `DOODLE_ADDR` — bind address (default `127.0.0.1:8080`)
//! - `DOODLE_REDIS_URL` — Redis URL for multi-instance fan-out; without
//!   it the server runs standalone
//! - `RUST_LOG` — log filter (default `info`)
//!
//! Connect with any WebSocket client and send JSON events, e.g.
//! `{"type": "join", "room": "lobby", "name": "ada"}`.

use scrawl::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ScrawlError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("DOODLE_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let mut builder = ScrawlServer::builder().bind(&addr);
    match std::env::var("DOODLE_REDIS_URL") {
        Ok(url) => {
            tracing::info!("joining backplane");
            builder = builder.backplane_url(url);
        }
        Err(_) => {
            tracing::info!("DOODLE_REDIS_URL not set, running standalone");
        }
    }

    let server = builder.build().await?;
    tracing::info!(%addr, "doodle listening");
    server.run().await
}

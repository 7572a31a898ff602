//! `ScrawlServer` builder and accept loop.
//!
//! This is the entry point for running a Scrawl server. It ties the
//! layers together: transport → protocol → gateway, with the optional
//! Redis backplane feeding remote frames into the gateway.

use std::sync::Arc;

use scrawl_backplane::RedisBackplane;
use scrawl_room::{BuiltinWords, WordSource};
use scrawl_transport::{Transport, WebSocketTransport};

use crate::gateway::{Gateway, GatewayConfig, GatewayHandle};
use crate::handler::handle_connection;
use crate::ScrawlError;

/// Builder for configuring and starting a Scrawl server.
///
/// # Example
///
/// ```rust,ignore
/// use scrawl::prelude::*;
///
/// let server = ScrawlServer::builder()
///     .bind("0.0.0.0:8080")
///     .backplane_url("redis://localhost:6379")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct ScrawlServerBuilder {
    bind_addr: String,
    config: GatewayConfig,
    words: Arc<dyn WordSource>,
    backplane_url: Option<String>,
}

impl ScrawlServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: GatewayConfig::default(),
            words: Arc::new(BuiltinWords),
            backplane_url: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the gateway configuration.
    pub fn gateway_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the built-in word list.
    pub fn words(mut self, words: impl WordSource) -> Self {
        self.words = Arc::new(words);
        self
    }

    /// Enables the Redis backplane for multi-instance fan-out.
    pub fn backplane_url(mut self, url: impl Into<String>) -> Self {
        self.backplane_url = Some(url.into());
        self
    }

    /// Builds the server: binds the transport, connects the backplane
    /// if configured, and spawns the gateway actor.
    pub async fn build(self) -> Result<ScrawlServer, ScrawlError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let (backplane, remote_rx) = match &self.backplane_url {
            Some(url) => {
                let (backplane, rx) = RedisBackplane::connect(url).await?;
                (Some(backplane), Some(rx))
            }
            None => {
                tracing::warn!(
                    "no backplane configured; fan-out limited to this instance"
                );
                (None, None)
            }
        };

        let gateway = Gateway::spawn(self.config.clone(), self.words, backplane);

        if let Some(mut rx) = remote_rx {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                while let Some(frame) = rx.recv().await {
                    gateway.remote(frame);
                }
            });
        }

        if let Some(ttl) = self.config.idle_ttl {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(ttl);
                // The first tick completes immediately; skip it.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    gateway.reap();
                }
            });
        }

        Ok(ScrawlServer { transport, gateway })
    }
}

impl Default for ScrawlServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Scrawl server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ScrawlServer {
    transport: WebSocketTransport,
    gateway: GatewayHandle,
}

impl ScrawlServer {
    /// Creates a new builder.
    pub fn builder() -> ScrawlServerBuilder {
        ScrawlServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ScrawlError> {
        tracing::info!("Scrawl server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let gateway = self.gateway.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, gateway).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

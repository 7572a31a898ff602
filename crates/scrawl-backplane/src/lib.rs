//! Cross-instance fan-out for Scrawl.
//!
//! A single instance needs no backplane: every member of a room is one of
//! its own connections. With several instances behind a load balancer,
//! members of one room can land on different instances, so every
//! room-scoped event is also published to Redis pub/sub and mirrored by
//! the siblings to *their* local members.
//!
//! The channel layout is one channel per room (`scrawl:room:<id>`); each
//! instance pattern-subscribes to all of them and filters by origin so it
//! never re-applies its own frames.
//!
//! Routing is not sticky here — an instance only ever touches its own
//! connections. Stickiness (keeping one room's members on one instance)
//! is a load-balancer concern, not a backplane one.

mod error;
mod frame;

pub use error::BackplaneError;
pub use frame::{channel_for, Frame, CHANNEL_PATTERN};

use futures_util::StreamExt;
use rand::Rng;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A connected Redis backplane.
///
/// Cheap to clone: the underlying `MultiplexedConnection` is designed to
/// be cloned per operation and used concurrently, no locking needed.
#[derive(Clone)]
pub struct RedisBackplane {
    origin: String,
    connection: MultiplexedConnection,
}

impl RedisBackplane {
    /// Connects to Redis and starts the subscriber.
    ///
    /// Returns the backplane handle plus the stream of frames published
    /// by *other* instances — frames carrying this instance's own origin
    /// id are dropped before they reach the receiver. The subscriber task
    /// runs until the receiver is dropped or the connection dies.
    ///
    /// # Errors
    /// Fails if the Redis connection or the pattern subscription cannot
    /// be established. Once connected, later failures end the subscriber
    /// with a logged warning instead of an error.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Frame>), BackplaneError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;

        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.psubscribe(CHANNEL_PATTERN).await?;

        let origin = generate_origin();
        info!(origin, "backplane connected");

        let (tx, rx) = mpsc::unbounded_channel();
        let task_origin = origin.clone();
        tokio::spawn(async move {
            let mut messages = pubsub.on_message();
            while let Some(msg) = messages.next().await {
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "unreadable backplane payload");
                        continue;
                    }
                };
                let frame: Frame = match serde_json::from_slice(&payload) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, "undecodable backplane frame");
                        continue;
                    }
                };
                if frame.origin == task_origin {
                    continue;
                }
                debug!(room = %frame.room, from = %frame.origin, "remote frame");
                if tx.send(frame).is_err() {
                    break;
                }
            }
            info!("backplane subscriber stopped");
        });

        Ok((Self { origin, connection }, rx))
    }

    /// This instance's origin id, stamped on every published frame.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Publishes one event to the room's channel, stamped with this
    /// instance's origin.
    pub async fn publish(
        &self,
        room: &scrawl_protocol::RoomId,
        recipient: scrawl_protocol::Recipient,
        event: scrawl_protocol::ServerEvent,
    ) -> Result<(), BackplaneError> {
        let frame = Frame {
            origin: self.origin.clone(),
            room: room.clone(),
            recipient,
            event,
        };
        let payload =
            serde_json::to_vec(&frame).map_err(BackplaneError::Encode)?;
        let mut conn = self.connection.clone();
        let () = conn.publish(channel_for(room), payload).await?;
        Ok(())
    }
}

/// Random 128-bit instance id as lowercase hex.
fn generate_origin() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_32_hex_chars() {
        let origin = generate_origin();
        assert_eq!(origin.len(), 32);
        assert!(origin.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_origins_are_unique() {
        assert_ne!(generate_origin(), generate_origin());
    }
}

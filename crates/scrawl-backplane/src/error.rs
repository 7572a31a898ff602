//! Error types for the backplane.

/// Errors from publishing or receiving backplane frames.
///
/// Backplane failures are never fatal to local gameplay — the gateway
/// logs them and keeps serving its own connections.
#[derive(Debug, thiserror::Error)]
pub enum BackplaneError {
    /// The Redis connection could not be established or dropped.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A frame could not be serialized for publishing.
    #[error("failed to encode frame: {0}")]
    Encode(serde_json::Error),

    /// An incoming payload was not a valid frame.
    #[error("failed to decode frame: {0}")]
    Decode(serde_json::Error),
}

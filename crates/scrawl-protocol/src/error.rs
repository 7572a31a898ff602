//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or shape-checking
/// events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or an
    /// unknown event tag.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The event decoded fine but violates an input constraint
    /// (length bounds, non-object stroke payload).
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

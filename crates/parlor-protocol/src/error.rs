//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating
/// wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown `type` tag,
    /// missing fields, wrong shapes.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates a protocol rule — e.g. a room
    /// code that is not four letters.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

//! Error types for smsync wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding packets.
#[derive(Debug, Error)]
pub enum WireError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Packet was empty
    #[error("empty packet")]
    Empty,
}

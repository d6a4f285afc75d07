//! Error types for peeruno wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// A follower-bound message was offered where an intent was expected
    #[error("not an intent: {0}")]
    NotAnIntent(String),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),
}

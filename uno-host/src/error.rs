//! Error types for uno-host.

use uno_peer::TransportError;
use uno_types::WireError;

/// Main error type for host operations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame could not be encoded or decoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The authority task has stopped; no more intents are accepted.
    #[error("authority mailbox closed")]
    MailboxClosed,
}

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, HostError>;

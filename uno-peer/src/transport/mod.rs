//! Transport abstraction for peeruno.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying link between a follower and the authority (in-memory for
//! simulations, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` opens a link to the authority's address
//! - `send()` transmits one encoded message
//! - `recv()` receives one encoded message
//! - `close()` gracefully terminates
//!
//! The authority side accepts links through a [`Listener`]. Delivery is
//! reliable and FIFO per link; nothing is ordered across links.
//!
//! # Example
//!
//! ```ignore
//! let network = MemoryNetwork::new(64);
//! let mut listener = network.listen("table-1")?;
//!
//! let transport = network.transport(PlayerId::new());
//! transport.connect("table-1").await?;
//! let (peer_id, link) = listener.accept().await?;
//! ```

mod memory;
mod mock;

pub use memory::{MemoryListener, MemoryNetwork, MemoryTransport};
pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;
use uno_types::PlayerId;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection timeout.
    #[error("connection timeout")]
    Timeout,

    /// Nobody is listening at the address.
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),
}

/// Transport trait for sending and receiving protocol messages.
///
/// Implementations handle the underlying connection mechanism
/// (in-memory channels, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the authority identified by the given address.
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Send bytes over the connection.
    ///
    /// The bytes are one encoded [`uno_types::Message`].
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive bytes from the connection.
    ///
    /// Waits until data is available or the connection closes.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Source of inbound links on the authority side.
#[async_trait]
pub trait Listener: Send {
    /// Link type handed out per accepted peer.
    type Link: Transport + 'static;

    /// Wait for the next peer to open a link.
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the listener has
    /// shut down and no more links will arrive.
    async fn accept(&mut self) -> Result<(PlayerId, Self::Link), TransportError>;
}

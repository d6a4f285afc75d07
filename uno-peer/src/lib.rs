//! # uno-peer
//!
//! Networking side of a peeruno participant.
//!
//! ## Features
//!
//! - **Transport Abstraction**: Pluggable link layer (in-memory, mock)
//! - **Follower Proxy**: Forwards intents, mirrors authority snapshots
//! - **Pure State Machine**: Link lifecycle from uno-core
//!
//! ## Example
//!
//! ```ignore
//! use uno_peer::{Follower, MemoryNetwork};
//!
//! let network = MemoryNetwork::new(64);
//! let id = PlayerId::new();
//! let mut follower = Follower::new(id, "table-1", network.transport(id));
//!
//! follower.connect("Ada").await?;
//! follower.send_chat("hello").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod follower;
pub mod transport;

pub use follower::{Follower, FollowerError, FollowerEvent};
pub use transport::{
    Listener, MemoryListener, MemoryNetwork, MemoryTransport, MockTransport, Transport,
    TransportError,
};

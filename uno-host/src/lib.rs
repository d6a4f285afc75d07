//! # uno-host
//!
//! Authority runtime for peeruno.
//!
//! The hosting participant runs this crate. It:
//! - Owns the only mutable game state and chat log, inside one task
//! - Accepts follower links and registers them in a connection registry
//! - Applies intents strictly one at a time through a bounded mailbox
//! - Broadcasts complete snapshots to every link after each transition
//!
//! ## Architecture
//!
//! ```text
//! Follower A ──┐                          ┌── Follower B
//!              │  intents        snapshots │
//!              ▼                           │
//!        ┌──────────────────────────────────┴─┐
//!        │ Session (reader) ─► mailbox ─► Authority task
//!        │                                    │
//!        │ Session (writer) ◄─ ConnectionRegistry ◄┘
//!        └────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! Followers send `Join`, `StartGame`, `PlayCard`, `DrawCard` and `Chat`.
//! The host answers with `SyncState` (whole game) and `SyncChat` (whole chat
//! log). Rejected intents get no answer.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod authority;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;
mod session;

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig};
pub use error::{HostError, Result};
pub use registry::ConnectionRegistry;
pub use server::Host;

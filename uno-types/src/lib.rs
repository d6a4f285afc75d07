//! # uno-types
//!
//! Wire format and data model for peeruno, a serverless multiplayer UNO
//! game where one peer (the authority) owns the game state and every other
//! peer (a follower) mirrors snapshots of it.
//!
//! This crate provides the foundational types used across all peeruno crates:
//! - [`PlayerId`], [`CardId`], [`MessageId`] - Identity types
//! - [`Card`], [`Color`], [`Value`] - The immutable card model
//! - [`GameState`], [`Player`], [`GameStatus`], [`Direction`] - The snapshot
//!   the authority broadcasts
//! - [`ChatMessage`] - One entry of the append-only chat log
//! - [`Message`], [`Intent`] - Protocol messages
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod card;
mod chat;
mod error;
mod ids;
mod messages;
mod state;

pub use card::{Card, Color, Value, PLAYABLE_COLORS};
pub use chat::{now_millis, ChatMessage};
pub use error::WireError;
pub use ids::{CardId, MessageId, PlayerId};
pub use messages::{
    Chat, ErrorMessage, Intent, Join, Message, MessageType, PlayCard, SyncChat, SyncState,
};
pub use state::{Direction, GameState, GameStatus, Player};

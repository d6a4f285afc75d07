//! # uno-core
//!
//! Pure logic for peeruno (no I/O, instant tests).
//!
//! This crate implements the rules and state machines of the game without
//! any network or task machinery, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior when seeded (same seed + intents → same state)
//! - Easy reasoning about state transitions
//!
//! The authority state machine returns [`Action`]s instead of sending
//! anything. `uno-host` owns the mailbox that serializes intents and
//! interprets the actions as broadcasts; `uno-peer` drives [`LinkState`]
//! for a follower's connection.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authority;
pub mod link;
pub mod rules;

pub use authority::{Action, AuthorityState, Rejection, RulesConfig};
pub use link::{LinkEvent, LinkNotice, LinkState};
pub use rules::{
    build_deck, is_legal_play, next_player_index, playable_cards, shuffle, DECK_SIZE, HAND_SIZE,
};

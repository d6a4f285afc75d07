//! Protocol messages for peeruno.
//!
//! A closed set of shapes travels over every link. Followers send intents
//! to the authority; the authority answers with whole snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CardId, ChatMessage, Color, GameState, WireError};

/// All possible protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Ask to take a seat in the lobby
    Join(Join),
    /// Authority asks to deal and begin play
    StartGame,
    /// Play a card from hand
    PlayCard(PlayCard),
    /// Draw from the deck, ending the turn
    DrawCard,
    /// Append to the chat log
    Chat(Chat),
    /// Complete game snapshot (authority → follower)
    SyncState(SyncState),
    /// Complete chat log (authority → follower)
    SyncChat(SyncChat),
    /// Transport-level failure text for the user; never a game rejection
    Error(ErrorMessage),
}

impl Message {
    /// Serialize to MessagePack bytes (named fields).
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        rmp_serde::to_vec_named(self).map_err(WireError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        rmp_serde::from_slice(bytes).map_err(WireError::Deserialization)
    }

    /// Discriminator, for logging and routing.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Join(_) => MessageType::Join,
            Message::StartGame => MessageType::StartGame,
            Message::PlayCard(_) => MessageType::PlayCard,
            Message::DrawCard => MessageType::DrawCard,
            Message::Chat(_) => MessageType::Chat,
            Message::SyncState(_) => MessageType::SyncState,
            Message::SyncChat(_) => MessageType::SyncChat,
            Message::Error(_) => MessageType::Error,
        }
    }
}

/// Message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Join intent
    Join,
    /// StartGame intent
    StartGame,
    /// PlayCard intent
    PlayCard,
    /// DrawCard intent
    DrawCard,
    /// Chat intent
    Chat,
    /// State snapshot
    SyncState,
    /// Chat snapshot
    SyncChat,
    /// Transport failure notice
    Error,
}

impl MessageType {
    /// Whether messages of this type flow from follower to authority.
    pub fn is_intent(&self) -> bool {
        matches!(
            self,
            MessageType::Join
                | MessageType::StartGame
                | MessageType::PlayCard
                | MessageType::DrawCard
                | MessageType::Chat
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Request to join the lobby under a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    /// Display name for the new seat
    pub name: String,
}

/// Request to play one card from hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayCard {
    /// Card to play; must be in the sender's hand
    pub card_id: CardId,
    /// Color to switch to when the card is wild
    pub chosen_color: Option<Color>,
}

/// Chat text to append to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Message body
    pub text: String,
}

/// Complete game snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// The authority's state after the latest transition
    pub state: GameState,
}

/// Complete chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChat {
    /// Every message so far, oldest first
    pub messages: Vec<ChatMessage>,
}

/// User-visible transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Human-readable description
    pub message: String,
}

/// The authority-bound subset of [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Take a seat in the lobby
    Join {
        /// Display name
        name: String,
    },
    /// Deal and begin play (authority only)
    StartGame,
    /// Play a card from hand
    PlayCard {
        /// Card to play
        card_id: CardId,
        /// Color to switch to when the card is wild
        chosen_color: Option<Color>,
    },
    /// Draw one card and pass the turn
    DrawCard,
    /// Append to the chat log
    Chat {
        /// Message body
        text: String,
    },
}

impl Intent {
    /// Discriminator of the wire message this intent travels as.
    pub fn message_type(&self) -> MessageType {
        match self {
            Intent::Join { .. } => MessageType::Join,
            Intent::StartGame => MessageType::StartGame,
            Intent::PlayCard { .. } => MessageType::PlayCard,
            Intent::DrawCard => MessageType::DrawCard,
            Intent::Chat { .. } => MessageType::Chat,
        }
    }
}

impl From<Intent> for Message {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Join { name } => Message::Join(Join { name }),
            Intent::StartGame => Message::StartGame,
            Intent::PlayCard {
                card_id,
                chosen_color,
            } => Message::PlayCard(PlayCard {
                card_id,
                chosen_color,
            }),
            Intent::DrawCard => Message::DrawCard,
            Intent::Chat { text } => Message::Chat(Chat { text }),
        }
    }
}

impl TryFrom<Message> for Intent {
    type Error = WireError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        match message {
            Message::Join(Join { name }) => Ok(Intent::Join { name }),
            Message::StartGame => Ok(Intent::StartGame),
            Message::PlayCard(PlayCard {
                card_id,
                chosen_color,
            }) => Ok(Intent::PlayCard {
                card_id,
                chosen_color,
            }),
            Message::DrawCard => Ok(Intent::DrawCard),
            Message::Chat(Chat { text }) => Ok(Intent::Chat { text }),
            other => Err(WireError::NotAnIntent(other.message_type().to_string())),
        }
    }
}

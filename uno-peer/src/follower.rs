//! Follower - the non-authority participant's view of the game.
//!
//! A [`Follower`] holds no authoritative data. It forwards intents to the
//! authority and replaces its local views wholesale whenever a snapshot
//! arrives. It never validates: every intent is optimistic and the
//! authority may silently ignore it.
//!
//! # Architecture
//!
//! ```text
//! Application → Follower → Transport → Authority
//!                  ↓
//!             uno-core::LinkState (pure state machine)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut follower = Follower::new(my_id, "table-1", transport);
//! follower.connect("Ada").await?;
//!
//! loop {
//!     match follower.poll().await? {
//!         FollowerEvent::StateUpdated if follower.is_my_turn() => { /* play */ }
//!         FollowerEvent::Disconnected => break,
//!         _ => {}
//!     }
//! }
//! ```

use thiserror::Error;
use uno_core::{LinkEvent, LinkNotice, LinkState};
use uno_types::{
    Card, CardId, ChatMessage, Color, GameState, GameStatus, Intent, Message, PlayerId, WireError,
};

use crate::transport::{Transport, TransportError};

/// Follower errors.
#[derive(Debug, Error)]
pub enum FollowerError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame could not be encoded or decoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Intent attempted without an open link.
    #[error("not connected")]
    NotConnected,
}

/// What changed after [`Follower::poll`] applied one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowerEvent {
    /// The game view was replaced.
    StateUpdated,
    /// The chat view was replaced.
    ChatUpdated,
    /// A transport-level problem to show the user.
    Error(String),
    /// The link to the authority is gone.
    Disconnected,
}

/// A participant that mirrors the authority's snapshots.
pub struct Follower<T: Transport> {
    id: PlayerId,
    address: String,
    transport: T,
    link: LinkState,
    state: Option<GameState>,
    chat: Vec<ChatMessage>,
}

impl<T: Transport> Follower<T> {
    /// Create a follower for peer `id` that will join the authority at
    /// `address`.
    pub fn new(id: PlayerId, address: &str, transport: T) -> Self {
        Self {
            id,
            address: address.to_string(),
            transport,
            link: LinkState::new(),
            state: None,
            chat: Vec::new(),
        }
    }

    /// Open the link and ask to join under `name`.
    ///
    /// On failure the link is left in [`LinkState::Failed`] and the call may
    /// be retried.
    pub async fn connect(&mut self, name: &str) -> Result<(), FollowerError> {
        self.apply_link(LinkEvent::ConnectRequested);

        if let Err(e) = self.transport.connect(&self.address).await {
            self.apply_link(LinkEvent::ConnectFailed {
                error: e.to_string(),
            });
            return Err(e.into());
        }
        self.apply_link(LinkEvent::ConnectSucceeded);

        self.send_intent(Intent::Join {
            name: name.to_string(),
        })
        .await
    }

    /// Ask the authority to deal and begin.
    pub async fn start_game(&self) -> Result<(), FollowerError> {
        self.send_intent(Intent::StartGame).await
    }

    /// Play a card from hand, naming a color when it is wild.
    pub async fn play_card(
        &self,
        card_id: CardId,
        chosen_color: Option<Color>,
    ) -> Result<(), FollowerError> {
        self.send_intent(Intent::PlayCard {
            card_id,
            chosen_color,
        })
        .await
    }

    /// Draw a card, ending the turn.
    pub async fn draw_card(&self) -> Result<(), FollowerError> {
        self.send_intent(Intent::DrawCard).await
    }

    /// Post to the chat log.
    pub async fn send_chat(&self, text: &str) -> Result<(), FollowerError> {
        self.send_intent(Intent::Chat {
            text: text.to_string(),
        })
        .await
    }

    /// Encode and send one intent.
    pub async fn send_intent(&self, intent: Intent) -> Result<(), FollowerError> {
        if !self.link.is_connected() {
            return Err(FollowerError::NotConnected);
        }
        let kind = intent.message_type();
        let bytes = Message::from(intent).to_bytes()?;
        self.transport.send(&bytes).await?;
        tracing::debug!(peer = %self.id, %kind, "Sent intent");
        Ok(())
    }

    /// Receive one message from the authority and apply it.
    ///
    /// Authority-bound messages echoed back at a follower are skipped.
    /// Undecodable frames are returned as [`FollowerError::Wire`]; the link
    /// stays usable.
    pub async fn poll(&mut self) -> Result<FollowerEvent, FollowerError> {
        loop {
            let bytes = match self.transport.recv().await {
                Ok(bytes) => bytes,
                Err(TransportError::ConnectionClosed | TransportError::NotConnected) => {
                    self.apply_link(LinkEvent::Closed {
                        reason: "link closed".into(),
                    });
                    return Ok(FollowerEvent::Disconnected);
                }
                Err(e) => {
                    tracing::warn!(peer = %self.id, error = %e, "Receive failed");
                    return Ok(FollowerEvent::Error(e.to_string()));
                }
            };

            let message = Message::from_bytes(&bytes).map_err(|e| {
                tracing::warn!(peer = %self.id, error = %e, "Dropping undecodable frame");
                e
            })?;

            match message {
                Message::SyncState(sync) => {
                    self.state = Some(sync.state);
                    return Ok(FollowerEvent::StateUpdated);
                }
                Message::SyncChat(sync) => {
                    self.chat = sync.messages;
                    return Ok(FollowerEvent::ChatUpdated);
                }
                Message::Error(error) => return Ok(FollowerEvent::Error(error.message)),
                other => {
                    tracing::debug!(peer = %self.id, kind = %other.message_type(), "Ignoring authority-bound message");
                }
            }
        }
    }

    /// Close the link.
    pub async fn close(&mut self) -> Result<(), FollowerError> {
        self.apply_link(LinkEvent::CloseRequested);
        self.transport.close().await?;
        Ok(())
    }

    /// This follower's peer id.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Current link lifecycle state.
    pub fn link_state(&self) -> &LinkState {
        &self.link
    }

    /// Latest game snapshot, once one has arrived.
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Latest chat log.
    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    /// Cards in this follower's hand according to the latest snapshot.
    pub fn my_hand(&self) -> &[Card] {
        self.state
            .as_ref()
            .and_then(|s| s.player(&self.id))
            .map(|p| p.hand.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the latest snapshot says it is this follower's move.
    pub fn is_my_turn(&self) -> bool {
        self.state.as_ref().is_some_and(|s| {
            s.status == GameStatus::Playing
                && s.current_player().is_some_and(|p| p.id == self.id)
        })
    }

    fn apply_link(&mut self, event: LinkEvent) {
        let (next, notice) = std::mem::take(&mut self.link).on_event(event);
        self.link = next;
        match notice {
            Some(LinkNotice::Connected) => {
                tracing::info!(peer = %self.id, address = %self.address, "Connected to authority")
            }
            Some(LinkNotice::ConnectionFailed { error }) => {
                tracing::warn!(peer = %self.id, address = %self.address, %error, "Connection failed")
            }
            Some(LinkNotice::Disconnected { reason }) => {
                tracing::info!(peer = %self.id, %reason, "Disconnected from authority")
            }
            None => {}
        }
    }
}

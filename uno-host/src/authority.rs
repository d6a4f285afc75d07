//! The authority task.
//!
//! One tokio task owns the [`AuthorityState`] and drains a bounded mailbox
//! of commands. Each intent is applied and its broadcasts are queued on
//! every link before the next command is read, so no two intents ever
//! interleave.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use uno_core::{Action, AuthorityState};
use uno_types::{ChatMessage, GameState, GameStatus, Intent, Message, PlayerId, SyncChat, SyncState};

use crate::registry::{ConnectionRegistry, Frame};

/// Commands accepted by the authority mailbox.
#[derive(Debug)]
pub(crate) enum Command {
    /// Apply one intent on behalf of `sender`.
    Intent {
        /// Peer the intent arrived from
        sender: PlayerId,
        /// What they asked for
        intent: Intent,
    },
    /// A peer's link went away.
    LinkClosed {
        /// Peer whose link closed
        peer: PlayerId,
    },
    /// Stop after the commands already queued.
    Shutdown,
}

/// Canonical state plus the channels its snapshots are published on.
pub(crate) struct Authority {
    host_id: PlayerId,
    state: AuthorityState,
    registry: Arc<ConnectionRegistry>,
    state_view: watch::Sender<GameState>,
    chat_view: watch::Sender<Vec<ChatMessage>>,
}

impl Authority {
    pub(crate) fn new(
        host_id: PlayerId,
        state: AuthorityState,
        registry: Arc<ConnectionRegistry>,
        state_view: watch::Sender<GameState>,
        chat_view: watch::Sender<Vec<ChatMessage>>,
    ) -> Self {
        Self {
            host_id,
            state,
            registry,
            state_view,
            chat_view,
        }
    }

    /// Process commands until shutdown or until every sender is gone.
    pub(crate) async fn run(mut self, mut mailbox: mpsc::Receiver<Command>) {
        while let Some(command) = mailbox.recv().await {
            match command {
                Command::Intent { sender, intent } => self.apply(sender, intent),
                Command::LinkClosed { peer } => self.link_closed(peer),
                Command::Shutdown => break,
            }
        }
        tracing::info!(host = %self.host_id, "Authority stopped");
    }

    fn apply(&mut self, sender: PlayerId, intent: Intent) {
        let kind = intent.message_type();
        let status_before = self.state.state().status;

        let actions = match self.state.handle(sender, intent) {
            Ok(actions) => actions,
            Err(rejection) => {
                tracing::debug!(%sender, %kind, %rejection, "Intent rejected");
                return;
            }
        };
        tracing::debug!(%sender, %kind, actions = actions.len(), "Intent applied");

        let state = self.state.state();
        match (status_before, state.status) {
            (GameStatus::Lobby | GameStatus::Ended, GameStatus::Playing) => {
                tracing::info!(players = state.players.len(), "Game started");
            }
            (GameStatus::Playing, GameStatus::Ended) => {
                tracing::info!(winner = state.winner.as_deref().unwrap_or("?"), "Game ended");
            }
            _ => {}
        }

        for action in actions {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::BroadcastState(state) => {
                if let Some(frame) = encode(Message::SyncState(SyncState {
                    state: state.clone(),
                })) {
                    let delivered = self.registry.broadcast(frame);
                    tracing::debug!(delivered, "Broadcast state");
                }
                self.state_view.send_replace(state);
            }
            Action::BroadcastChat(messages) => {
                if let Some(frame) = encode(Message::SyncChat(SyncChat {
                    messages: messages.clone(),
                })) {
                    let delivered = self.registry.broadcast(frame);
                    tracing::debug!(delivered, "Broadcast chat");
                }
                self.chat_view.send_replace(messages);
            }
            Action::SendChat { to, messages } => {
                if to == self.host_id {
                    self.chat_view.send_replace(messages);
                } else if let Some(frame) = encode(Message::SyncChat(SyncChat { messages })) {
                    if !self.registry.send_to(&to, frame) {
                        tracing::debug!(peer = %to, "Chat unicast target has no link");
                    }
                }
            }
        }
    }

    fn link_closed(&self, peer: PlayerId) {
        let state = self.state.state();
        match state.player(&peer) {
            Some(player) if state.status == GameStatus::Playing => {
                // The seat stays; play stalls if it comes round to them
                tracing::warn!(%peer, name = %player.name, "Player link closed mid-game");
            }
            Some(player) => tracing::info!(%peer, name = %player.name, "Player link closed"),
            None => tracing::debug!(%peer, "Link closed before joining"),
        }
    }
}

fn encode(message: Message) -> Option<Frame> {
    match message.to_bytes() {
        Ok(bytes) => Some(Frame::from(bytes)),
        Err(e) => {
            tracing::warn!(kind = %message.message_type(), error = %e, "Failed to encode frame");
            None
        }
    }
}

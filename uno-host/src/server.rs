//! Main Host coordination.
//!
//! [`Host`] starts the authority task, accepts links into the connection
//! registry, and gives the hosting player the same intent path every
//! follower uses.
//!
//! # Example
//!
//! ```ignore
//! let host = Host::start(Config::default(), host_id, "Ada")?;
//! let network = MemoryNetwork::new(64);
//! let listener = network.listen("table-1")?;
//!
//! let server = host.clone();
//! tokio::spawn(async move { server.serve(listener).await });
//!
//! host.start_game().await?;
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use uno_core::AuthorityState;
use uno_peer::{Listener, Transport, TransportError};
use uno_types::{Card, CardId, ChatMessage, Color, GameState, GameStatus, Intent, PlayerId};

use crate::authority::{Authority, Command};
use crate::config::Config;
use crate::error::{HostError, Result};
use crate::registry::ConnectionRegistry;
use crate::session::Session;

/// Handle to a running authority.
///
/// Clones share the same authority, registry and views.
#[derive(Clone)]
pub struct Host {
    id: PlayerId,
    config: Arc<Config>,
    registry: Arc<ConnectionRegistry>,
    mailbox: mpsc::Sender<Command>,
    state_view: watch::Receiver<GameState>,
    chat_view: watch::Receiver<Vec<ChatMessage>>,
    actor: Arc<Mutex<Option<JoinHandle<()>>>>,
    sessions: Arc<Mutex<Vec<AbortHandle>>>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("links", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Host {
    /// Open a lobby with `host_name` as the authority player and spawn the
    /// authority task. Must be called inside a tokio runtime.
    pub fn start(config: Config, host_id: PlayerId, host_name: &str) -> Result<Self> {
        config.validate()?;
        let state = AuthorityState::new(host_id, host_name, config.game.clone());
        Ok(Self::launch(config, host_id, state))
    }

    /// Like [`Host::start`], but deals from a seeded shuffle.
    pub fn start_seeded(
        config: Config,
        host_id: PlayerId,
        host_name: &str,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let state = AuthorityState::seeded(host_id, host_name, config.game.clone(), seed);
        Ok(Self::launch(config, host_id, state))
    }

    fn launch(config: Config, host_id: PlayerId, state: AuthorityState) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let (state_tx, state_rx) = watch::channel(state.state().clone());
        let (chat_tx, chat_rx) = watch::channel(state.chat().to_vec());
        let (mailbox, inbox) = mpsc::channel(config.server.mailbox_capacity);

        let authority = Authority::new(host_id, state, Arc::clone(&registry), state_tx, chat_tx);
        let actor = tokio::spawn(authority.run(inbox));

        tracing::info!(
            host = %host_id,
            mailbox_capacity = config.server.mailbox_capacity,
            "Host started"
        );

        Self {
            id: host_id,
            config: Arc::new(config),
            registry,
            mailbox,
            state_view: state_rx,
            chat_view: chat_rx,
            actor: Arc::new(Mutex::new(Some(actor))),
            sessions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The hosting player's id.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Configuration the host was started with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Live links.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Register an inbound link for `peer` and start its session.
    ///
    /// The link is registered before this returns, so it receives every
    /// broadcast from then on.
    pub fn attach<L: Transport + 'static>(&self, peer: PlayerId, link: L) {
        let (session, writer) = Session::open(
            peer,
            link,
            Arc::clone(&self.registry),
            self.mailbox.clone(),
            self.config.server.link_buffer,
        );
        let reader = tokio::spawn(session.run());

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|handle| !handle.is_finished());
        sessions.push(reader.abort_handle());
        sessions.push(writer.abort_handle());
    }

    /// Accept links from `listener` until it closes.
    pub async fn serve<Li: Listener>(&self, mut listener: Li) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((peer, link)) => self.attach(peer, link),
                Err(TransportError::ConnectionClosed) => {
                    tracing::info!("Listener closed");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Submit one of the hosting player's own intents.
    ///
    /// Goes through the same mailbox as every remote intent.
    pub async fn submit(&self, intent: Intent) -> Result<()> {
        self.mailbox
            .send(Command::Intent {
                sender: self.id,
                intent,
            })
            .await
            .map_err(|_| HostError::MailboxClosed)
    }

    /// Deal and begin play.
    pub async fn start_game(&self) -> Result<()> {
        self.submit(Intent::StartGame).await
    }

    /// Play a card from the host's hand.
    pub async fn play_card(&self, card_id: CardId, chosen_color: Option<Color>) -> Result<()> {
        self.submit(Intent::PlayCard {
            card_id,
            chosen_color,
        })
        .await
    }

    /// Draw a card, ending the host's turn.
    pub async fn draw_card(&self) -> Result<()> {
        self.submit(Intent::DrawCard).await
    }

    /// Post to the chat log.
    pub async fn send_chat(&self, text: &str) -> Result<()> {
        self.submit(Intent::Chat {
            text: text.to_string(),
        })
        .await
    }

    /// Latest canonical snapshot.
    pub fn state(&self) -> GameState {
        self.state_view.borrow().clone()
    }

    /// Latest chat log.
    pub fn chat(&self) -> Vec<ChatMessage> {
        self.chat_view.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn watch_state(&self) -> watch::Receiver<GameState> {
        self.state_view.clone()
    }

    /// Subscribe to chat log updates.
    pub fn watch_chat(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.chat_view.clone()
    }

    /// The host player's hand in the latest snapshot.
    pub fn my_hand(&self) -> Vec<Card> {
        self.state_view
            .borrow()
            .player(&self.id)
            .map(|p| p.hand.clone())
            .unwrap_or_default()
    }

    /// Whether the latest snapshot says it is the host's move.
    pub fn is_my_turn(&self) -> bool {
        let state = self.state_view.borrow();
        state.status == GameStatus::Playing
            && state.current_player().is_some_and(|p| p.id == self.id)
    }

    /// Close every link, stop the authority and wait for it to finish.
    ///
    /// Intents already in the mailbox are applied first. Later calls on any
    /// clone of this handle return [`HostError::MailboxClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.registry.clear();
        let sessions: Vec<AbortHandle> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for session in sessions {
            session.abort();
        }

        let actor = self
            .actor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(actor) = actor else {
            return Ok(());
        };

        // The actor may already have stopped; then there is nobody to tell
        let _ = self.mailbox.send(Command::Shutdown).await;
        if let Err(e) = actor.await {
            tracing::warn!(error = %e, "Authority task ended abnormally");
        }
        tracing::info!(host = %self.id, "Host shut down");
        Ok(())
    }
}

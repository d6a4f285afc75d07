//! Per-link session management.
//!
//! Each accepted link gets a [`Session`]: a reader that decodes frames into
//! intents for the authority mailbox, and a writer that drains the link's
//! outbound queue. The session registers the link on start and removes it
//! when the link closes.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uno_peer::{Transport, TransportError};
use uno_types::{Intent, Message, PlayerId};

use crate::authority::Command;
use crate::registry::{ConnectionRegistry, Frame, LinkId, Released};

/// A per-link session.
pub(crate) struct Session<L: Transport> {
    peer: PlayerId,
    link: Arc<L>,
    link_id: LinkId,
    registry: Arc<ConnectionRegistry>,
    mailbox: mpsc::Sender<Command>,
}

impl<L: Transport + 'static> Session<L> {
    /// Register the link and spawn its writer. The caller runs [`Session::run`]
    /// for the reader side.
    pub(crate) fn open(
        peer: PlayerId,
        link: L,
        registry: Arc<ConnectionRegistry>,
        mailbox: mpsc::Sender<Command>,
        link_buffer: usize,
    ) -> (Self, JoinHandle<()>) {
        let link = Arc::new(link);
        let (outbound, queue) = mpsc::channel(link_buffer.max(1));
        let (link_id, released) = registry.register(peer, outbound);
        let writer = tokio::spawn(write_loop(peer, Arc::clone(&link), queue, released));

        let session = Self {
            peer,
            link,
            link_id,
            registry,
            mailbox,
        };
        (session, writer)
    }

    /// Read until the link closes, then unregister it.
    pub(crate) async fn run(self) {
        tracing::info!(peer = %self.peer, link_id = self.link_id, "Link attached");

        loop {
            let bytes = match self.link.recv().await {
                Ok(bytes) => bytes,
                Err(TransportError::ConnectionClosed | TransportError::NotConnected) => {
                    tracing::debug!(peer = %self.peer, "Link closed by peer");
                    break;
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer, error = %e, "Link receive failed");
                    break;
                }
            };

            let message = match Message::from_bytes(&bytes) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(peer = %self.peer, error = %e, "Dropping undecodable frame");
                    continue;
                }
            };

            let intent = match Intent::try_from(message) {
                Ok(intent) => intent,
                Err(e) => {
                    tracing::warn!(peer = %self.peer, error = %e, "Ignoring follower-bound message");
                    continue;
                }
            };

            tracing::debug!(peer = %self.peer, kind = %intent.message_type(), "Received intent");
            let command = Command::Intent {
                sender: self.peer,
                intent,
            };
            if self.mailbox.send(command).await.is_err() {
                tracing::debug!(peer = %self.peer, "Authority stopped; ending session");
                break;
            }
        }

        self.registry.unregister(&self.peer, self.link_id);
        if let Err(e) = self.link.close().await {
            tracing::debug!(peer = %self.peer, error = %e, "Error closing link");
        }
        // Best effort: the authority may already be gone
        let _ = self
            .mailbox
            .send(Command::LinkClosed { peer: self.peer })
            .await;
        tracing::info!(peer = %self.peer, link_id = self.link_id, "Link closed");
    }
}

/// Drain the outbound queue onto the link until the registration is
/// released or the link fails, then close the link.
///
/// A release also interrupts a send that is waiting on a peer that stopped
/// reading.
async fn write_loop<L: Transport>(
    peer: PlayerId,
    link: Arc<L>,
    mut queue: mpsc::Receiver<Frame>,
    mut released: Released,
) {
    loop {
        let frame = tokio::select! {
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = &mut released => {
                tracing::debug!(%peer, "Link released");
                break;
            }
        };
        tokio::select! {
            sent = link.send(&frame) => {
                if let Err(e) = sent {
                    tracing::warn!(%peer, error = %e, "Link send failed");
                    break;
                }
            }
            _ = &mut released => {
                tracing::debug!(%peer, "Link released while sending");
                break;
            }
        }
    }
    if let Err(e) = link.close().await {
        tracing::debug!(%peer, error = %e, "Error closing link");
    }
}

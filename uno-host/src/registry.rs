//! Connection registry.
//!
//! Maps each connected peer to the outbound queue of its link. The registry
//! is owned by the [`Host`](crate::Host) and handed to the authority task and
//! every session by `Arc`.
//!
//! Queuing never waits. A link whose queue is full is evicted: its entry is
//! removed, which releases the link's writer so it closes the link.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use uno_types::PlayerId;

/// One encoded frame, shared by every link it is sent on.
pub type Frame = Arc<[u8]>;

/// Identifies one registration, so a stale session cannot remove the link
/// that replaced it.
pub type LinkId = u64;

/// Resolves once the registration is gone: unregistered, evicted,
/// replaced or cleared.
pub type Released = oneshot::Receiver<()>;

#[derive(Debug)]
struct Entry {
    link_id: LinkId,
    outbound: mpsc::Sender<Frame>,
    // Dropped with the entry, which resolves the writer's `Released`
    _release: oneshot::Sender<()>,
}

/// Live links by peer id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    links: DashMap<PlayerId, Entry>,
    next_link_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outbound queue for `peer`.
    ///
    /// A peer that already had a link is switched to the new one and the
    /// old registration is released.
    pub fn register(&self, peer: PlayerId, outbound: mpsc::Sender<Frame>) -> (LinkId, Released) {
        let link_id = self.next_link_id.fetch_add(1, Ordering::Relaxed);
        let (release, released) = oneshot::channel();
        let entry = Entry {
            link_id,
            outbound,
            _release: release,
        };
        if self.links.insert(peer, entry).is_some() {
            tracing::debug!(%peer, link_id, "Replaced existing link");
        }
        tracing::debug!(%peer, link_id, total = self.links.len(), "Registered link");
        (link_id, released)
    }

    /// Remove `peer` if it is still registered under `link_id`.
    ///
    /// Returns true if an entry was removed.
    pub fn unregister(&self, peer: &PlayerId, link_id: LinkId) -> bool {
        let removed = self
            .links
            .remove_if(peer, |_, entry| entry.link_id == link_id)
            .is_some();
        if removed {
            tracing::debug!(%peer, link_id, remaining = self.links.len(), "Unregistered link");
        }
        removed
    }

    /// Whether `peer` has a live link.
    pub fn contains(&self, peer: &PlayerId) -> bool {
        self.links.contains_key(peer)
    }

    /// Number of live links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links are registered.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Queue `frame` on every link. Returns how many links accepted it.
    ///
    /// Links that are full or whose writer has gone are evicted.
    pub fn broadcast(&self, frame: Frame) -> usize {
        // Collect first; evicting while iterating would deadlock the shard
        let targets: Vec<(PlayerId, LinkId, mpsc::Sender<Frame>)> = self
            .links
            .iter()
            .map(|entry| (*entry.key(), entry.link_id, entry.outbound.clone()))
            .collect();

        targets
            .into_iter()
            .filter(|(peer, link_id, outbound)| {
                self.offer(peer, *link_id, outbound, Arc::clone(&frame))
            })
            .count()
    }

    /// Queue `frame` on one peer's link. Returns false if the peer has no
    /// live link or was evicted.
    pub fn send_to(&self, peer: &PlayerId, frame: Frame) -> bool {
        let target = self
            .links
            .get(peer)
            .map(|entry| (entry.link_id, entry.outbound.clone()));

        match target {
            Some((link_id, outbound)) => self.offer(peer, link_id, &outbound, frame),
            None => false,
        }
    }

    fn offer(
        &self,
        peer: &PlayerId,
        link_id: LinkId,
        outbound: &mpsc::Sender<Frame>,
        frame: Frame,
    ) -> bool {
        match outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%peer, link_id, "Outbound queue full; evicting link");
                self.unregister(peer, link_id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.unregister(peer, link_id);
                false
            }
        }
    }

    /// Release every link, ending all writers.
    pub fn clear(&self) {
        self.links.clear();
    }
}

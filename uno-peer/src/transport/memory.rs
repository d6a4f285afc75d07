//! In-process transport over tokio channels.
//!
//! A [`MemoryNetwork`] is a shared address book. The authority calls
//! [`MemoryNetwork::listen`] to claim an address; followers obtain a
//! [`MemoryTransport`] from the network and connect to that address. Each
//! link is a pair of bounded `mpsc` channels, so delivery is reliable and
//! FIFO per link with no ordering across links.

use super::{Listener, Transport, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};
use uno_types::PlayerId;

type Incoming = (PlayerId, MemoryTransport);

/// Shared address book for in-memory links.
#[derive(Debug, Clone)]
pub struct MemoryNetwork {
    listeners: Arc<Mutex<HashMap<String, mpsc::Sender<Incoming>>>>,
    link_buffer: usize,
}

impl MemoryNetwork {
    /// Create a network whose links buffer up to `link_buffer` frames per
    /// direction.
    pub fn new(link_buffer: usize) -> Self {
        Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
            link_buffer: link_buffer.max(1),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<String, mpsc::Sender<Incoming>>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `address` and start accepting links on it.
    pub fn listen(&self, address: &str) -> Result<MemoryListener, TransportError> {
        let mut listeners = self.listeners();
        if listeners
            .get(address)
            .is_some_and(|tx| !tx.is_closed())
        {
            return Err(TransportError::ConnectionFailed(format!(
                "address already in use: {address}"
            )));
        }

        let (tx, rx) = mpsc::channel(self.link_buffer);
        listeners.insert(address.to_string(), tx);
        Ok(MemoryListener {
            address: address.to_string(),
            incoming: rx,
        })
    }

    /// An unconnected transport for the peer `local_id`.
    pub fn transport(&self, local_id: PlayerId) -> MemoryTransport {
        MemoryTransport {
            local_id,
            network: Some(self.clone()),
            link: Arc::new(LinkEnds::default()),
        }
    }

    fn listener_for(&self, address: &str) -> Option<mpsc::Sender<Incoming>> {
        self.listeners()
            .get(address)
            .filter(|tx| !tx.is_closed())
            .cloned()
    }
}

/// Authority-side acceptor for one address.
#[derive(Debug)]
pub struct MemoryListener {
    address: String,
    incoming: mpsc::Receiver<Incoming>,
}

impl MemoryListener {
    /// The address this listener claimed.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Listener for MemoryListener {
    type Link = MemoryTransport;

    async fn accept(&mut self) -> Result<(PlayerId, MemoryTransport), TransportError> {
        self.incoming
            .recv()
            .await
            .ok_or(TransportError::ConnectionClosed)
    }
}

#[derive(Debug, Default)]
struct LinkEnds {
    outbound: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    inbound: AsyncMutex<Option<mpsc::Receiver<Vec<u8>>>>,
    closed: AtomicBool,
    close_signal: Notify,
}

/// One end of an in-memory link.
///
/// Clones share the same link, so a session may read on one task while it
/// writes on another.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    local_id: PlayerId,
    network: Option<MemoryNetwork>,
    link: Arc<LinkEnds>,
}

impl MemoryTransport {
    fn connected_end(
        local_id: PlayerId,
        outbound: mpsc::Sender<Vec<u8>>,
        inbound: mpsc::Receiver<Vec<u8>>,
    ) -> Self {
        Self {
            local_id,
            network: None,
            link: Arc::new(LinkEnds {
                outbound: Mutex::new(Some(outbound)),
                inbound: AsyncMutex::new(Some(inbound)),
                closed: AtomicBool::new(false),
                close_signal: Notify::new(),
            }),
        }
    }

    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::Sender<Vec<u8>>>> {
        self.link
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let network = self.network.as_ref().ok_or_else(|| {
            TransportError::ConnectionFailed("accepted links cannot reconnect".into())
        })?;
        if self.is_connected() {
            return Err(TransportError::ConnectionFailed("already connected".into()));
        }
        let listener = network
            .listener_for(address)
            .ok_or_else(|| TransportError::PeerUnavailable(address.to_string()))?;

        let buffer = network.link_buffer;
        let (to_remote, remote_inbound) = mpsc::channel(buffer);
        let (to_local, local_inbound) = mpsc::channel(buffer);
        let remote = MemoryTransport::connected_end(self.local_id, to_local, remote_inbound);

        listener
            .send((self.local_id, remote))
            .await
            .map_err(|_| TransportError::PeerUnavailable(address.to_string()))?;

        *self.link.inbound.lock().await = Some(local_inbound);
        *self.outbound() = Some(to_remote);
        self.link.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let sender = self.outbound().clone().ok_or(TransportError::NotConnected)?;
        sender
            .send(data.to_vec())
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        if self.link.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let mut guard = self.link.inbound.lock().await;
        let inbound = guard.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            tokio::select! {
                frame = inbound.recv() => return frame.ok_or(TransportError::ConnectionClosed),
                _ = self.link.close_signal.notified() => {
                    // A permit left over from before a reconnect is ignored
                    if self.link.closed.load(Ordering::SeqCst) {
                        return Err(TransportError::ConnectionClosed);
                    }
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        !self.link.closed.load(Ordering::SeqCst)
            && self
                .outbound()
                .as_ref()
                .is_some_and(|tx| !tx.is_closed())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.link.closed.store(true, Ordering::SeqCst);
        self.outbound().take();
        self.link.close_signal.notify_one();
        Ok(())
    }
}

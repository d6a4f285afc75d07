//! Mock transport for testing.
//!
//! Allows queueing inbound messages, capturing what was sent, and forcing
//! failures at each step of a link's life.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uno_types::{Message, WireError};

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while a follower owns
/// the other.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connected_address: Option<String>,
    sent: Vec<Vec<u8>>,
    inbound: VecDeque<Vec<u8>>,
    unavailable: Vec<String>,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue raw bytes to be returned by a later `recv()` call.
    pub fn queue_response(&self, data: Vec<u8>) {
        self.lock().inbound.push_back(data);
    }

    /// Encode and queue a message as if the authority had sent it.
    pub fn queue_message(&self, message: &Message) -> Result<(), WireError> {
        let bytes = message.to_bytes()?;
        self.queue_response(bytes);
        Ok(())
    }

    /// All raw frames that were sent.
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Sent frames decoded back into messages. Undecodable frames are skipped.
    pub fn sent_decoded(&self) -> Vec<Message> {
        self.lock()
            .sent
            .iter()
            .filter_map(|bytes| Message::from_bytes(bytes).ok())
            .collect()
    }

    /// The last frame that was sent.
    pub fn last_sent(&self) -> Option<Vec<u8>> {
        self.lock().sent.last().cloned()
    }

    /// The address that was connected to.
    pub fn connected_address(&self) -> Option<String> {
        self.lock().connected_address.clone()
    }

    /// Make every connect() to `address` fail as if nobody listens there.
    pub fn make_unavailable(&self, address: &str) {
        self.lock().unavailable.push(address.to_string());
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.lock().fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.lock().fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.lock().fail_next_recv = Some(error.to_string());
    }

    /// Clear all state (frames, queue, connection, forced failures).
    pub fn reset(&self) {
        *self.lock() = MockTransportInner::default();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();

        if inner.unavailable.iter().any(|a| a == address) {
            return Err(TransportError::PeerUnavailable(address.to_string()));
        }
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.connected_address = Some(address.to_string());
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.lock();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent.push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut inner = self.lock();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_next_recv.take() {
            return Err(TransportError::ReceiveFailed(error));
        }

        // An empty queue reads as the remote end having gone away
        inner
            .inbound
            .pop_front()
            .ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.lock().connected = false;
        Ok(())
    }
}

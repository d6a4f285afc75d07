//! Chat log entries.

use serde::{Deserialize, Serialize};

use crate::{MessageId, PlayerId};

/// One entry of the authority's append-only chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier
    pub id: MessageId,
    /// Peer that sent the message
    pub sender_id: PlayerId,
    /// Display name of the sender at the time of sending
    pub sender_name: String,
    /// Message body
    pub text: String,
    /// Unix timestamp (milliseconds) assigned by the authority
    pub timestamp: u64,
}

impl ChatMessage {
    /// Create a message stamped with a fresh id and the current time.
    pub fn new(sender_id: PlayerId, sender_name: &str, text: &str) -> Self {
        Self {
            id: MessageId::new(),
            sender_id,
            sender_name: sender_name.to_string(),
            text: text.to_string(),
            timestamp: now_millis(),
        }
    }
}

/// Current Unix time in milliseconds (0 if the clock is before the epoch).
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! Link state machine for a follower's connection to the authority.
//!
//! Pure and side-effect-free: the machine takes an event and produces a new
//! state plus an optional notice for the application. The actual connecting
//! and sending is done by `uno-peer`.
//!
//! There is no automatic reconnection. A failed open leaves the machine in
//! [`LinkState::Failed`] and the caller decides whether to try again.

/// Link lifecycle - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No link open.
    #[default]
    Disconnected,
    /// Open in progress.
    Connecting,
    /// Link open; intents may be sent.
    Connected,
    /// The last open attempt failed.
    Failed {
        /// Description of the failure.
        error: String,
    },
}

/// Things that happen to a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Application asked to open the link.
    ConnectRequested,
    /// Transport opened the link.
    ConnectSucceeded,
    /// Transport could not open the link.
    ConnectFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The remote end or the transport closed the link.
    Closed {
        /// Reason for the close.
        reason: String,
    },
    /// Application asked to close the link.
    CloseRequested,
}

/// Notices surfaced to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkNotice {
    /// Link is open.
    Connected,
    /// Opening the link failed; the caller may retry.
    ConnectionFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// An open link went away.
    Disconnected {
        /// Reason for the disconnect.
        reason: String,
    },
}

impl LinkState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus any notice to emit.
    pub fn on_event(self, event: LinkEvent) -> (Self, Option<LinkNotice>) {
        match (self, event) {
            (Self::Disconnected | Self::Failed { .. }, LinkEvent::ConnectRequested) => {
                (Self::Connecting, None)
            }

            (Self::Connecting, LinkEvent::ConnectSucceeded) => {
                (Self::Connected, Some(LinkNotice::Connected))
            }
            (Self::Connecting, LinkEvent::ConnectFailed { error }) => (
                Self::Failed {
                    error: error.clone(),
                },
                Some(LinkNotice::ConnectionFailed { error }),
            ),
            (Self::Connecting, LinkEvent::CloseRequested) => (Self::Disconnected, None),

            (Self::Connected, LinkEvent::Closed { reason }) => (
                Self::Disconnected,
                Some(LinkNotice::Disconnected { reason }),
            ),
            (Self::Connected, LinkEvent::CloseRequested) => (
                Self::Disconnected,
                Some(LinkNotice::Disconnected {
                    reason: "user requested".into(),
                }),
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, None),
        }
    }

    /// Check if the link is open.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if an open is in progress.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }
}

//! Session event stream.
//!
//! Every frame the session sends or receives, and every frame it drops, is
//! published as a [`LightEvent`] on a bounded broadcast channel. Slow
//! subscribers lose the oldest events rather than stalling the session.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use govee_types::RegisterKey;

/// Events emitted by a light session.
///
/// All events are serializable for logging and IPC. Byte strings are
/// lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightEvent {
    /// A frame was decoded.
    Recv { key: RegisterKey, value: String },
    /// A frame was written.
    Send { frame: String },
    /// A frame failed its checksum and was dropped.
    ChecksumError { frame: String },
    /// A request was abandoned: superseded by a later reply, or a heartbeat
    /// read went unanswered.
    Timeout { key: RegisterKey },
    /// A frame was dropped or nobody was waiting for it.
    Unexpected { frame: String, reason: String },
}

/// Sender for light events.
pub type EventSender = broadcast::Sender<LightEvent>;

/// Receiver for light events.
pub type EventReceiver = broadcast::Receiver<LightEvent>;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: LightEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

//! Event bus for console lifecycle notifications
//!
//! Uses tokio::sync::broadcast for pub/sub pattern.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::player::PlayerState;
use crate::smartglass::models::ConnectionState;

/// Event types that can be published on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BusEvent {
    PollerStarted { device_id: String },
    PollerStopped { device_id: String },

    ConnectionChanged {
        device_id: String,
        state: ConnectionState,
    },
    PlayerStateChanged {
        device_id: String,
        state: PlayerState,
    },
    SourceChanged {
        device_id: String,
        source: Option<String>,
    },

    /// Bridge runs an unsupported core version; polling has stopped talking to it.
    ServerIncompatible { version: String, required: String },
}

/// Event bus handle for publishing and subscribing
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: BusEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    /// 64 events of backlog
    fn default() -> Self {
        Self::new(64)
    }
}

/// Shared event bus wrapped in Arc for thread-safe sharing
pub type SharedBus = Arc<EventBus>;

pub fn create_bus() -> SharedBus {
    Arc::new(EventBus::default())
}

//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Shared via `Arc<EventBus>`; every subscriber independently receives
//! every published [`SessionEvent`].

use chrono::{DateTime, Utc};
use pullup_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// A lifecycle or generation event for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Snake-case event name, e.g. `"session_started"`.
    pub event_type: String,

    pub user_id: DbId,

    /// Session the event refers to, taken from the payload's `sessionId`.
    pub session_id: Option<DbId>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(user_id: DbId, event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        let session_id = payload.get("sessionId").and_then(serde_json::Value::as_i64);
        Self {
            event_type: event_type.into(),
            user_id,
            session_id,
            payload,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event, returning how many subscribers will see it.
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

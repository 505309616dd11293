//! Event bus for publish progress
//!
//! Services emit [`Event`]s while a submit moves through its phases. The bus
//! is a `tokio::sync::broadcast` channel: emitting never blocks, events are
//! dropped when nobody listens, and lagging subscribers lose the oldest
//! events first.
//!
//! ```no_run
//! use libtootcast::service::events::{Event, EventBus, PublishPhase};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(Event::PhaseChanged { phase: PublishPhase::Validating });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // No receivers is not an error
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Phase of the publish state machine
///
/// `Idle → Validating → (UploadingAttachments) → Publishing → Succeeded | Failed`.
/// `Failed` returns to `Idle` immediately, `Succeeded` once the delayed
/// navigation has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPhase {
    Idle,
    Validating,
    UploadingAttachments,
    Publishing,
    Succeeded,
    Failed,
}

/// Events emitted during a submit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PhaseChanged { phase: PublishPhase },

    /// One attachment finished uploading
    AttachmentUploaded {
        index: usize,
        file: String,
        media_id: String,
    },

    StatusPublished {
        id: String,
        url: Option<String>,
        scheduled: bool,
    },

    PublishFailed { error: String },
}

//! Event bus for mutation notifications

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Things that happened to an owner's data. Readers re-fetch when they see one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A session was established for the owner
    SignedIn { owner_id: Uuid },

    /// One of the owner's sessions was terminated. `last_session` is set when no other session remains.
    SignedOut { owner_id: Uuid, last_session: bool },

    PropertyCreated {
        owner_id: Uuid,
        property_id: Uuid,
    },

    DocumentUploaded {
        owner_id: Uuid,
        document_id: Uuid,
        property_id: Option<Uuid>,
    },

    DocumentDeleted {
        owner_id: Uuid,
        document_id: Uuid,
    },
}

impl Event {
    pub fn owner_id(&self) -> Uuid {
        match self {
            Event::SignedIn { owner_id }
            | Event::SignedOut { owner_id, .. }
            | Event::PropertyCreated { owner_id, .. }
            | Event::DocumentUploaded { owner_id, .. }
            | Event::DocumentDeleted { owner_id, .. } => *owner_id,
        }
    }

    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            Event::SignedIn { .. } => "signed_in",
            Event::SignedOut { .. } => "signed_out",
            Event::PropertyCreated { .. } => "property_created",
            Event::DocumentUploaded { .. } => "document_uploaded",
            Event::DocumentDeleted { .. } => "document_deleted",
        }
    }
}

/// Event bus for broadcasting events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: Event) {
        tracing::debug!(event = event.name(), owner_id = %event.owner_id(), "emit");
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

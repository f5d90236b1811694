//! Session events broadcast to observers (views, the CLI printer, tests).

use tokio::sync::broadcast;

use crate::gateway::ChatMetadata;
use crate::message::{ChatMessage, MessageId};

#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageAppended(ChatMessage),
    /// Streamed text appended to an open message.
    ContentAppended { id: MessageId, delta: String },
    MessageClosed { id: MessageId },
    /// The log was rebuilt from a history snapshot.
    HistoryReplaced { len: usize },
    LoadingChanged(bool),
    MetadataLoaded(ChatMetadata),
    /// History could not be loaded because the credential was rejected.
    SignInRequired,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

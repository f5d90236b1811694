//! Controller for one attached chat session.
//!
//! A `SessionController` owns the session's log actor, event bus, loading
//! flag and cancellation token. Bootstrap and submission are implemented
//! in their own modules on top of it.

mod bootstrap;
mod submit;
mod types;


pub use submit::compose_prompt;
pub use types::{
    BootstrapReport, ChatSession, FirstMessageOutcome, HistoryOutcome, SessionConfig,
    Submission, SubmitOutcome,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use learna_common::ChatId;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::events::{EventBus, SessionEvent};
use crate::gateway::{ChatGateway, ChatMetadata};
use crate::handoff::FirstInputHandoff;
use crate::log::LogHandle;
use crate::message::ChatMessage;
use crate::streaming::StreamConsumer;
use crate::ChatError;

const EVENT_CAPACITY: usize = 256;

pub struct SessionController {
    chat: ChatId,
    gateway: Arc<dyn ChatGateway>,
    handoff: FirstInputHandoff,
    config: SessionConfig,
    log: LogHandle,
    events: EventBus,
    consumer: StreamConsumer,
    metadata: RwLock<Option<ChatMetadata>>,
    /// Set while a submission or the first-message stream is in flight.
    loading: AtomicBool,
    first_message_started: AtomicBool,
    cancel: CancellationToken,
}

impl SessionController {
    /// Attach to `chat`. Must be called inside a tokio runtime; spawns the
    /// session's log actor. Call `bootstrap` next to load its state.
    pub fn attach(
        chat: ChatId,
        gateway: Arc<dyn ChatGateway>,
        handoff: FirstInputHandoff,
        config: SessionConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let events = EventBus::new(EVENT_CAPACITY);
        let log = LogHandle::spawn(events.clone(), cancel.clone());
        let consumer = StreamConsumer::new(log.clone(), config.chunk_idle, cancel.clone());
        debug!(chat_id = %chat, "session attached");

        Self {
            chat,
            gateway,
            handoff,
            config,
            log,
            events,
            consumer,
            metadata: RwLock::new(None),
            loading: AtomicBool::new(false),
            first_message_started: AtomicBool::new(false),
            cancel,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the log in display order.
    pub async fn messages(&self) -> Result<Vec<ChatMessage>, ChatError> {
        self.log.snapshot().await
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn metadata(&self) -> Option<ChatMetadata> {
        self.metadata
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn session(&self) -> ChatSession {
        let (model, agent) = self.model_and_agent();
        ChatSession {
            id: self.chat,
            model,
            agent,
            first_input_pending: self.handoff.contains(self.chat),
        }
    }

    /// Tear the session down. In-flight streams stop and every later log
    /// operation fails with `SessionClosed`.
    pub fn detach(&self) {
        if !self.cancel.is_cancelled() {
            debug!(chat_id = %self.chat, "session detached");
            self.cancel.cancel();
        }
    }

    pub fn is_detached(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn set_metadata(&self, metadata: ChatMetadata) {
        *self
            .metadata
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(metadata);
    }

    /// Model and agent from metadata, falling back to configured defaults
    /// for fields that are missing or empty.
    fn model_and_agent(&self) -> (String, String) {
        let meta = self.metadata().unwrap_or_default();
        let pick = |value: String, fallback: &str| {
            if value.is_empty() {
                fallback.to_string()
            } else {
                value
            }
        };
        (
            pick(meta.model, &self.config.default_model),
            pick(meta.agent, &self.config.default_agent),
        )
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

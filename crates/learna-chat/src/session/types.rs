//! Session types and the loading guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use learna_common::ChatId;

use crate::events::{EventBus, SessionEvent};
use crate::gateway::Attachment;
use crate::message::MessageId;
use crate::streaming::StreamSummary;
use crate::ChatError;

/// Guard that clears the loading flag on drop, so it is released even if
/// the submission future is cancelled or returns early.
pub(crate) struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
    events: &'a EventBus,
}

impl<'a> LoadingGuard<'a> {
    /// Set the loading flag. Returns `Busy` if it is already set.
    pub(crate) fn acquire(flag: &'a AtomicBool, events: &'a EventBus) -> Result<Self, ChatError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        events.publish(SessionEvent::LoadingChanged(true));
        Ok(Self { flag, events })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.events.publish(SessionEvent::LoadingChanged(false));
    }
}

/// Per-session settings supplied by the host application.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Used when chat metadata has not loaded.
    pub default_model: String,
    pub default_agent: String,
    pub chunk_idle: Duration,
    /// Upload every attachment instead of only the first.
    pub upload_all_attachments: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_model: "openai/gpt-oss-20b".to_string(),
            default_agent: "tutor".to_string(),
            chunk_idle: Duration::from_secs(120),
            upload_all_attachments: false,
        }
    }
}

/// Point-in-time view of the attached chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: ChatId,
    pub model: String,
    pub agent: String,
    /// A first input is still waiting to be streamed.
    pub first_input_pending: bool,
}

/// One user turn. Moved into `submit`, so the caller's input is consumed.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

impl Submission {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty prompt and no attachments.
    Skipped,
    Completed {
        user: MessageId,
        reply: MessageId,
        stream: StreamSummary,
    },
}

#[derive(Debug)]
pub enum FirstMessageOutcome {
    /// No pending input for this chat, or already run for this attachment.
    Skipped,
    Streamed(StreamSummary),
    Failed(ChatError),
}

#[derive(Debug)]
pub enum HistoryOutcome {
    /// Log rebuilt; holds its new length.
    Loaded(usize),
    SignInRequired,
    Failed(ChatError),
}

#[derive(Debug)]
pub struct BootstrapReport {
    pub metadata_loaded: bool,
    pub first_message: FirstMessageOutcome,
    pub history: HistoryOutcome,
}

impl BootstrapReport {
    pub fn history_loaded(&self) -> bool {
        matches!(self.history, HistoryOutcome::Loaded(_))
    }

    pub fn sign_in_required(&self) -> bool {
        matches!(self.history, HistoryOutcome::SignInRequired)
    }
}

//! Streaming chat core for Learna.
//!
//! Provides the client side of one conversation with the assistant:
//! - Ordered message log behind a single-writer actor
//! - Incremental UTF-8 decoding of chunked reply bodies
//! - Submission pipeline (upload, compose, send, stream)
//! - Bootstrap that reconciles first message, history and metadata
//! - Typed HTTP gateway for the remote chat API

pub mod dashboard;
pub mod events;
pub mod gateway;
pub mod handoff;
pub mod log;
pub mod message;
pub mod session;
pub mod streaming;

#[cfg(test)]
mod testing;

pub use dashboard::{start_chat, NewChatRequest};
pub use events::{EventBus, SessionEvent};
pub use gateway::{
    Attachment, AuthContext, ChatGateway, ChatMetadata, ChatSummary, HttpGateway,
    HttpGatewayConfig, NewChat, OutgoingMessage, UploadedDocument,
};
pub use handoff::{FirstInputHandoff, PendingFirstInput};
pub use log::{LogHandle, MessageLog, TurnId};
pub use message::{ChatMessage, MessageId, RemoteMessage, Sender};
pub use session::{
    compose_prompt, BootstrapReport, ChatSession, FirstMessageOutcome, HistoryOutcome,
    SessionConfig, SessionController, Submission, SubmitOutcome,
};
pub use streaming::{ChunkStream, StreamConsumer, StreamSummary, Utf8Decoder};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(String),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("not authorized")]
    Auth,
    #[error("stream error: {0}")]
    Stream(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("session is busy with another request")]
    Busy,
    #[error("session closed")]
    SessionClosed,
    #[error(transparent)]
    Log(#[from] LogError),
}

impl From<ChatError> for learna_common::LearnaError {
    fn from(e: ChatError) -> Self {
        learna_common::LearnaError::Chat(e.to_string())
    }
}

/// Rejected message-log mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("unknown message {0}")]
    UnknownMessage(MessageId),
    #[error("message {0} is not open")]
    NotOpen(MessageId),
    #[error("message {0} is still streaming")]
    AlreadyStreaming(MessageId),
    #[error("message {0} is not a user message")]
    NotUser(MessageId),
}

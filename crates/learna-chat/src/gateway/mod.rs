//! Remote chat API: the `ChatGateway` trait, its wire types, and the
//! reqwest-backed `HttpGateway`.

mod http;


pub use http::{HttpGateway, HttpGatewayConfig};

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use learna_common::ChatId;
use serde::{Deserialize, Deserializer, Serialize};

use crate::message::RemoteMessage;
use crate::streaming::ChunkStream;
use crate::ChatError;

/// Bearer credential sent with every authenticated call.
///
/// An empty context sends no `Authorization` header and lets the server
/// answer 401.
#[derive(Clone, Default)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.is_empty()).then_some(token),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Body of a create-chat request. `title` is the first prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChat {
    pub title: String,
    pub model: String,
    pub agent: String,
}

/// Model and agent a chat was created with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatMetadata {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub agent: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub content: String,
    pub model: String,
    pub agent: String,
}

/// A file picked by the user, read into memory for upload.
#[derive(Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_for(&file_name).to_string();
        Self {
            file_name,
            bytes,
            mime,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("size", &self.bytes.len())
            .field("mime", &self.mime)
            .finish()
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

/// Text the server extracted from an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedDocument {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatSummary {
    pub id: ChatId,
    pub title: String,
}

/// Client of the remote chat store.
///
/// Streaming calls resolve once response headers arrive; the body is
/// handed back as a `ChunkStream` for the caller to consume.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn create_chat(&self, chat: &NewChat) -> Result<ChatId, ChatError>;

    async fn chat_metadata(&self, chat: ChatId) -> Result<ChatMetadata, ChatError>;

    async fn history(&self, chat: ChatId) -> Result<Vec<RemoteMessage>, ChatError>;

    /// Stream the reply to the prompt the chat was created with.
    async fn first_message(&self, chat: ChatId) -> Result<ChunkStream, ChatError>;

    async fn post_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<ChunkStream, ChatError>;

    async fn upload_document(&self, attachment: &Attachment)
        -> Result<UploadedDocument, ChatError>;

    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ChatError>;

    async fn rename_chat(&self, chat: ChatId, title: &str) -> Result<ChatSummary, ChatError>;

    async fn delete_chat(&self, chat: ChatId) -> Result<(), ChatError>;
}

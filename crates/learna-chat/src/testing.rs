//! Scripted in-memory gateway shared by the controller and dashboard tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use learna_common::ChatId;
use tokio::sync::{mpsc, Notify};

use crate::gateway::{
    Attachment, ChatGateway, ChatMetadata, ChatSummary, NewChat, OutgoingMessage,
    UploadedDocument,
};
use crate::message::RemoteMessage;
use crate::streaming::ChunkStream;
use crate::ChatError;

pub(crate) const CHAT: ChatId = ChatId::new(7);

pub(crate) type Chunk = Result<Vec<u8>, ChatError>;

pub(crate) fn text_stream(parts: &[&str]) -> ChunkStream {
    let parts: Vec<Chunk> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
    stream::iter(parts).boxed()
}

pub(crate) fn channel_stream(rx: mpsc::UnboundedReceiver<Chunk>) -> ChunkStream {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) }).boxed()
}

/// Scripted gateway. Each reply body is queued up front; history can be
/// held back until a test releases it.
#[derive(Default)]
pub(crate) struct FakeGateway {
    pub(crate) metadata: Mutex<Option<Result<ChatMetadata, ChatError>>>,
    pub(crate) history: Mutex<Option<Result<Vec<RemoteMessage>, ChatError>>>,
    pub(crate) history_gate: Option<Arc<Notify>>,
    pub(crate) first_message: Mutex<Option<ChunkStream>>,
    pub(crate) replies: Mutex<VecDeque<ChunkStream>>,
    pub(crate) upload: Mutex<Option<Result<UploadedDocument, ChatError>>>,
    pub(crate) sent: Mutex<Vec<OutgoingMessage>>,
    pub(crate) uploaded: Mutex<Vec<String>>,
    pub(crate) first_message_calls: AtomicUsize,
    pub(crate) created: Mutex<Vec<NewChat>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_metadata(self, model: &str, agent: &str) -> Self {
        *self.metadata.lock().unwrap() = Some(Ok(ChatMetadata {
            model: model.into(),
            agent: agent.into(),
        }));
        self
    }

    pub(crate) fn with_history(self, history: Result<Vec<RemoteMessage>, ChatError>) -> Self {
        *self.history.lock().unwrap() = Some(history);
        self
    }

    pub(crate) fn with_history_gate(mut self, gate: Arc<Notify>) -> Self {
        self.history_gate = Some(gate);
        self
    }

    pub(crate) fn with_first_message(self, body: ChunkStream) -> Self {
        *self.first_message.lock().unwrap() = Some(body);
        self
    }

    pub(crate) fn with_reply(self, body: ChunkStream) -> Self {
        self.replies.lock().unwrap().push_back(body);
        self
    }

    pub(crate) fn with_upload(self, result: Result<UploadedDocument, ChatError>) -> Self {
        *self.upload.lock().unwrap() = Some(result);
        self
    }

    pub(crate) fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn create_chat(&self, chat: &NewChat) -> Result<ChatId, ChatError> {
        self.created.lock().unwrap().push(chat.clone());
        Ok(CHAT)
    }

    async fn chat_metadata(&self, _chat: ChatId) -> Result<ChatMetadata, ChatError> {
        self.metadata
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ChatError::Network("metadata unavailable".into())))
    }

    async fn history(&self, _chat: ChatId) -> Result<Vec<RemoteMessage>, ChatError> {
        if let Some(gate) = &self.history_gate {
            gate.notified().await;
        }
        self.history
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn first_message(&self, _chat: ChatId) -> Result<ChunkStream, ChatError> {
        self.first_message_calls.fetch_add(1, Ordering::SeqCst);
        self.first_message
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ChatError::Api {
                status: 404,
                body: "no first message".into(),
            })
    }

    async fn post_message(
        &self,
        _chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<ChunkStream, ChatError> {
        self.sent.lock().unwrap().push(message.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ChatError::Network("connection refused".into()))
    }

    async fn upload_document(
        &self,
        attachment: &Attachment,
    ) -> Result<UploadedDocument, ChatError> {
        self.uploaded
            .lock()
            .unwrap()
            .push(attachment.file_name.clone());
        match &*self.upload.lock().unwrap() {
            Some(Ok(doc)) => Ok(doc.clone()),
            _ => Err(ChatError::Upload("HTTP 500: extraction failed".into())),
        }
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ChatError> {
        Ok(Vec::new())
    }

    async fn rename_chat(&self, chat: ChatId, title: &str) -> Result<ChatSummary, ChatError> {
        Ok(ChatSummary {
            id: chat,
            title: title.into(),
        })
    }

    async fn delete_chat(&self, _chat: ChatId) -> Result<(), ChatError> {
        Ok(())
    }
}

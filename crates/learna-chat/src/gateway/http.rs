//! `ChatGateway` over the REST API, built on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use learna_common::ChatId;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{
    Attachment, AuthContext, ChatGateway, ChatMetadata, ChatSummary, NewChat, OutgoingMessage,
    UploadedDocument,
};
use crate::message::RemoteMessage;
use crate::streaming::ChunkStream;
use crate::ChatError;

const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Server root, e.g. `http://localhost:5000/`.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Time allowed until response headers arrive.
    pub request_timeout: Duration,
}

impl HttpGatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct HttpGateway {
    config: HttpGatewayConfig,
    auth: AuthContext,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct CreatedChat {
    chat_id: ChatId,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig, auth: AuthContext) -> Result<Self, ChatError> {
        // No overall timeout: reply bodies stream for as long as the model
        // generates. Header and idle budgets are enforced separately.
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ChatError::Network(e.to_string()))?;
        Ok(Self { config, auth, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and wait for headers, bounded by the request timeout.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ChatError> {
        let budget = self.config.request_timeout;
        match tokio::time::timeout(budget, builder.send()).await {
            Err(_) => Err(ChatError::Timeout(format!(
                "no response within {}s",
                budget.as_secs_f64()
            ))),
            Ok(Err(e)) if e.is_timeout() => Err(ChatError::Timeout(e.to_string())),
            Ok(Err(e)) => Err(ChatError::Network(e.to_string())),
            Ok(Ok(response)) => Ok(response),
        }
    }

    async fn send_checked(&self, builder: RequestBuilder) -> Result<Response, ChatError> {
        let response = self.send(builder).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ChatError::Auth);
        }
        if !status.is_success() {
            return Err(ChatError::Api {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChatError> {
        let builder = self.authorized(self.http.get(self.url(path)));
        let response = self.send_checked(builder).await?;
        parse_json(response).await
    }

    async fn open_stream(&self, builder: RequestBuilder) -> Result<ChunkStream, ChatError> {
        let response = self.send_checked(builder).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ChatError::Stream(e.to_string()))
            })
            .boxed())
    }
}

async fn error_body(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    text.chars().take(ERROR_BODY_LIMIT).collect()
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ChatError> {
    response
        .json()
        .await
        .map_err(|e| ChatError::Parse(e.to_string()))
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn create_chat(&self, chat: &NewChat) -> Result<ChatId, ChatError> {
        debug!(model = %chat.model, agent = %chat.agent, "create chat request");
        let builder = self.authorized(self.http.post(self.url("api/chat"))).json(chat);
        let response = self.send_checked(builder).await?;
        let created: CreatedChat = parse_json(response).await?;
        Ok(created.chat_id)
    }

    async fn chat_metadata(&self, chat: ChatId) -> Result<ChatMetadata, ChatError> {
        debug!(chat_id = %chat, "chat metadata request");
        self.get_json(&format!("api/chat/{chat}")).await
    }

    async fn history(&self, chat: ChatId) -> Result<Vec<RemoteMessage>, ChatError> {
        debug!(chat_id = %chat, "history request");
        self.get_json(&format!("api/chat/{chat}/messages")).await
    }

    async fn first_message(&self, chat: ChatId) -> Result<ChunkStream, ChatError> {
        debug!(chat_id = %chat, "first-message stream request");
        let url = self.url(&format!("api/chat/{chat}/first-message"));
        self.open_stream(self.authorized(self.http.get(url))).await
    }

    async fn post_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<ChunkStream, ChatError> {
        debug!(
            chat_id = %chat,
            model = %message.model,
            agent = %message.agent,
            prompt_len = message.content.len(),
            "post message request"
        );
        let url = self.url(&format!("api/chat/{chat}/messages"));
        let builder = self.authorized(self.http.post(url)).json(message);
        self.open_stream(builder).await
    }

    async fn upload_document(
        &self,
        attachment: &Attachment,
    ) -> Result<UploadedDocument, ChatError> {
        debug!(
            file = %attachment.file_name,
            size = attachment.bytes.len(),
            "document upload request"
        );

        let part = reqwest::multipart::Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime)
            .map_err(|e| ChatError::Upload(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        // The upload endpoint is unauthenticated.
        let response = self
            .send(self.http.post(self.url("api/upload")).multipart(form))
            .await
            .map_err(|e| match e {
                ChatError::Network(msg) => ChatError::Upload(msg),
                other => other,
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ChatError::Auth);
        }
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ChatError::Upload(format!("HTTP {status}: {body}")));
        }
        parse_json(response).await
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ChatError> {
        self.get_json("api/navbar-summaries").await
    }

    async fn rename_chat(&self, chat: ChatId, title: &str) -> Result<ChatSummary, ChatError> {
        debug!(chat_id = %chat, "rename chat request");
        let url = self.url(&format!("api/chat/{chat}"));
        let builder = self
            .authorized(self.http.put(url))
            .json(&serde_json::json!({ "title": title }));
        let response = self.send_checked(builder).await?;
        parse_json(response).await
    }

    async fn delete_chat(&self, chat: ChatId) -> Result<(), ChatError> {
        debug!(chat_id = %chat, "delete chat request");
        let url = self.url(&format!("api/chat/{chat}"));
        self.send_checked(self.authorized(self.http.delete(url)))
            .await?;
        Ok(())
    }
}

//! New-chat flow: create a chat from a first prompt and leave the prompt
//! for the chat's session to stream.

use learna_common::ChatId;
use tracing::{debug, warn};

use crate::gateway::{Attachment, ChatGateway, NewChat};
use crate::handoff::FirstInputHandoff;
use crate::session::compose_prompt;
use crate::ChatError;

#[derive(Debug, Clone, Default)]
pub struct NewChatRequest {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    pub model: String,
    pub agent: String,
}

/// Create a chat whose title is the composed first prompt.
///
/// Returns `None` for an empty prompt with no attachments. On success a
/// non-empty trimmed prompt is stored in `handoff` under the new chat's
/// id, where the session's bootstrap picks it up. An attachment-only chat
/// leaves no handoff, so no first reply is requested for it.
pub async fn start_chat(
    gateway: &dyn ChatGateway,
    handoff: &FirstInputHandoff,
    request: NewChatRequest,
    upload_all_attachments: bool,
) -> Result<Option<ChatId>, ChatError> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() && request.attachments.is_empty() {
        return Ok(None);
    }

    let take = if upload_all_attachments {
        request.attachments.len()
    } else {
        1
    };
    let mut documents = Vec::new();
    for attachment in request.attachments.iter().take(take) {
        let doc = gateway.upload_document(attachment).await.inspect_err(|e| {
            warn!(file = %attachment.file_name, error = %e, "upload failed, chat not created");
        })?;
        documents.push(doc);
    }

    let chat = NewChat {
        title: compose_prompt(prompt, &documents),
        model: request.model,
        agent: request.agent,
    };
    let id = gateway.create_chat(&chat).await?;
    if !prompt.is_empty() {
        handoff.put(id, prompt);
    }
    debug!(chat_id = %id, model = %chat.model, agent = %chat.agent, "chat created");
    Ok(Some(id))
}

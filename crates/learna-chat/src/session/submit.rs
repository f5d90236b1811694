//! Submission pipeline: upload, compose, send, stream.

use learna_common::new_correlation_id;
use tracing::{debug, warn};

use super::types::{LoadingGuard, Submission, SubmitOutcome};
use super::SessionController;
use crate::gateway::{Attachment, OutgoingMessage, UploadedDocument};
use crate::log::TurnId;
use crate::ChatError;

const DOCUMENT_SEPARATOR: &str = "\n\n---\nHere is my document:\n";

/// Append extracted document text to a prompt, one separator per document.
pub fn compose_prompt(prompt: &str, documents: &[UploadedDocument]) -> String {
    let mut composed = prompt.to_string();
    for doc in documents {
        composed.push_str(DOCUMENT_SEPARATOR);
        composed.push_str(&doc.text);
    }
    composed
}

impl SessionController {
    /// Run one user turn.
    ///
    /// Upload failures abort before anything is appended. Once the user
    /// message is in the log, a send or stream failure leaves it (and any
    /// partial reply) in place and returns the error.
    pub async fn submit(&self, submission: Submission) -> Result<SubmitOutcome, ChatError> {
        let Submission {
            prompt,
            attachments,
        } = submission;
        let prompt = prompt.trim();
        if prompt.is_empty() && attachments.is_empty() {
            return Ok(SubmitOutcome::Skipped);
        }
        if self.is_detached() {
            return Err(ChatError::SessionClosed);
        }

        let _guard = LoadingGuard::acquire(&self.loading, &self.events)?;
        let correlation_id = new_correlation_id();

        let attachments = if self.config.upload_all_attachments {
            &attachments[..]
        } else {
            &attachments[..attachments.len().min(1)]
        };

        let documents = self
            .upload_all(attachments, &correlation_id)
            .await
            .inspect_err(|e| {
                warn!(chat_id = %self.chat, %correlation_id, error = %e, "upload failed, submission aborted");
            })?;

        let display = if prompt.is_empty() {
            attachments
                .iter()
                .map(|a| a.file_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            prompt.to_string()
        };
        let (model, agent) = self.model_and_agent();
        let outgoing = OutgoingMessage {
            content: compose_prompt(prompt, &documents),
            model,
            agent,
        };

        let turn = self.log.begin_turn().await?;
        let result = self.run_turn(turn, display, &outgoing).await;
        let _ = self.log.end_turn(turn).await;

        match &result {
            Ok(SubmitOutcome::Completed { stream, .. }) => {
                debug!(
                    chat_id = %self.chat,
                    %correlation_id,
                    bytes = stream.bytes,
                    "submission complete"
                );
            }
            Ok(SubmitOutcome::Skipped) | Err(ChatError::SessionClosed) => {}
            Err(e) => {
                warn!(chat_id = %self.chat, %correlation_id, error = %e, "submission failed");
            }
        }
        result
    }

    async fn upload_all(
        &self,
        attachments: &[Attachment],
        correlation_id: &str,
    ) -> Result<Vec<UploadedDocument>, ChatError> {
        let mut documents = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let doc = self.gateway.upload_document(attachment).await?;
            debug!(
                correlation_id,
                file = %attachment.file_name,
                extracted = doc.text.len(),
                "document uploaded"
            );
            documents.push(doc);
        }
        Ok(documents)
    }

    async fn run_turn(
        &self,
        turn: TurnId,
        display: String,
        outgoing: &OutgoingMessage,
    ) -> Result<SubmitOutcome, ChatError> {
        let user = self.log.push_user(turn, display).await?;
        let body = self.gateway.post_message(self.chat, outgoing).await?;
        // The server stores the user message before it starts replying.
        self.log.acknowledge(user, outgoing.content.as_str()).await?;
        let reply = self.log.open_assistant(turn).await?;
        let stream = self.consumer.consume(body, reply).await?;
        Ok(SubmitOutcome::Completed {
            user,
            reply,
            stream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> UploadedDocument {
        UploadedDocument { text: text.into() }
    }

    #[test]
    fn compose_without_documents_is_the_prompt() {
        assert_eq!(compose_prompt("Explain recursion", &[]), "Explain recursion");
    }

    #[test]
    fn compose_appends_document_after_separator() {
        assert_eq!(
            compose_prompt("Summarize", &[doc("Stacks are LIFO.")]),
            "Summarize\n\n---\nHere is my document:\nStacks are LIFO."
        );
    }

    #[test]
    fn compose_with_empty_prompt_keeps_separator() {
        assert_eq!(
            compose_prompt("", &[doc("a"), doc("b")]),
            "\n\n---\nHere is my document:\na\n\n---\nHere is my document:\nb"
        );
    }
}

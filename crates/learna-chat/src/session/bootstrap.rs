//! Session entry: metadata, first message and history, reconciled into
//! one log.

use std::sync::atomic::Ordering;

use learna_common::new_correlation_id;
use tracing::{debug, warn};

use super::types::{BootstrapReport, FirstMessageOutcome, HistoryOutcome, LoadingGuard};
use super::SessionController;
use crate::events::SessionEvent;
use crate::streaming::StreamSummary;
use crate::ChatError;

impl SessionController {
    /// Load the chat's state.
    ///
    /// Metadata, the pending first message and history run concurrently.
    /// Whichever order they land in, the log ends up as the history
    /// snapshot followed by any reply that is still streaming. The first
    /// message is streamed at most once per attachment.
    pub async fn bootstrap(&self) -> BootstrapReport {
        let correlation_id = new_correlation_id();
        debug!(chat_id = %self.chat, %correlation_id, "bootstrap started");

        let (metadata_loaded, first_message, history) = tokio::join!(
            self.fetch_metadata(),
            self.fetch_first_message(&correlation_id),
            self.fetch_history(),
        );

        let report = BootstrapReport {
            metadata_loaded,
            first_message,
            history,
        };
        debug!(
            chat_id = %self.chat,
            %correlation_id,
            metadata_loaded = report.metadata_loaded,
            history_loaded = report.history_loaded(),
            "bootstrap finished"
        );
        report
    }

    async fn fetch_metadata(&self) -> bool {
        if self.metadata().is_some() {
            return true;
        }
        match self.gateway.chat_metadata(self.chat).await {
            Ok(metadata) => {
                self.set_metadata(metadata.clone());
                self.events.publish(SessionEvent::MetadataLoaded(metadata));
                true
            }
            Err(e) => {
                warn!(chat_id = %self.chat, error = %e, "chat metadata unavailable, using defaults");
                false
            }
        }
    }

    async fn fetch_first_message(&self, correlation_id: &str) -> FirstMessageOutcome {
        if !self.handoff.contains(self.chat) {
            return FirstMessageOutcome::Skipped;
        }
        if self.first_message_started.swap(true, Ordering::AcqRel) {
            return FirstMessageOutcome::Skipped;
        }
        // A submission in flight owns the reply slot. Leave the handoff in
        // place so the next bootstrap can stream the first message.
        let Ok(guard) = LoadingGuard::acquire(&self.loading, &self.events) else {
            self.first_message_started.store(false, Ordering::Release);
            debug!(chat_id = %self.chat, correlation_id, "submission in flight, first message deferred");
            return FirstMessageOutcome::Skipped;
        };
        let Some(pending) = self.handoff.take(self.chat) else {
            return FirstMessageOutcome::Skipped;
        };
        debug!(
            chat_id = %self.chat,
            correlation_id,
            prompt_len = pending.prompt.len(),
            "streaming first message"
        );

        let result = self.stream_first_message().await;
        drop(guard);
        match result {
            Ok(summary) => FirstMessageOutcome::Streamed(summary),
            Err(ChatError::SessionClosed) => FirstMessageOutcome::Failed(ChatError::SessionClosed),
            Err(e) => {
                warn!(chat_id = %self.chat, correlation_id, error = %e, "first message failed");
                FirstMessageOutcome::Failed(e)
            }
        }
    }

    async fn stream_first_message(&self) -> Result<StreamSummary, ChatError> {
        let body = self.gateway.first_message(self.chat).await?;
        let turn = self.log.begin_turn().await?;
        let result = async {
            let placeholder = self.log.open_assistant(turn).await?;
            self.consumer.consume(body, placeholder).await
        }
        .await;
        // Ignored: only fails once the session is closed.
        let _ = self.log.end_turn(turn).await;
        result
    }

    async fn fetch_history(&self) -> HistoryOutcome {
        match self.gateway.history(self.chat).await {
            Ok(history) => match self.log.apply_history(history).await {
                Ok(len) => {
                    debug!(chat_id = %self.chat, len, "history applied");
                    HistoryOutcome::Loaded(len)
                }
                Err(e) => HistoryOutcome::Failed(e),
            },
            Err(ChatError::Auth) => {
                warn!(chat_id = %self.chat, "history rejected the credential, sign-in required");
                self.events.publish(SessionEvent::SignInRequired);
                HistoryOutcome::SignInRequired
            }
            Err(e) => {
                warn!(chat_id = %self.chat, error = %e, "history unavailable");
                HistoryOutcome::Failed(e)
            }
        }
    }
}

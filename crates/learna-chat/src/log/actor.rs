//! Single-consumer mutation path for a session's message log.
//!
//! Every async operation that wants to touch the log sends a command to
//! one background task that owns the `MessageLog`. Commands are applied
//! strictly in arrival order, so concurrent streams, history loads and
//! submissions cannot interleave inside a mutation.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{MessageLog, TurnId};
use crate::events::{EventBus, SessionEvent};
use crate::message::{ChatMessage, MessageId, RemoteMessage};
use crate::{ChatError, LogError};

enum LogCommand {
    BeginTurn {
        reply: oneshot::Sender<TurnId>,
    },
    EndTurn {
        turn: TurnId,
    },
    PushUser {
        turn: TurnId,
        content: String,
        reply: oneshot::Sender<MessageId>,
    },
    Acknowledge {
        id: MessageId,
        content: String,
        reply: oneshot::Sender<Result<(), LogError>>,
    },
    OpenAssistant {
        turn: TurnId,
        reply: oneshot::Sender<Result<MessageId, LogError>>,
    },
    Append {
        id: MessageId,
        delta: String,
        reply: oneshot::Sender<Result<(), LogError>>,
    },
    Close {
        id: MessageId,
        reply: oneshot::Sender<Result<(), LogError>>,
    },
    ApplyHistory {
        history: Vec<RemoteMessage>,
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
}

/// Cloneable handle to a session's log actor.
///
/// Once the session is cancelled every call fails with
/// `ChatError::SessionClosed`.
#[derive(Clone)]
pub struct LogHandle {
    command_tx: mpsc::Sender<LogCommand>,
}

impl LogHandle {
    /// Spawn the log actor on the current tokio runtime.
    pub fn spawn(events: EventBus, cancel: CancellationToken) -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        tokio::spawn(log_actor(MessageLog::new(), command_rx, events, cancel));
        Self { command_tx }
    }

    pub async fn begin_turn(&self) -> Result<TurnId, ChatError> {
        self.request(|reply| LogCommand::BeginTurn { reply }).await
    }

    pub async fn end_turn(&self, turn: TurnId) -> Result<(), ChatError> {
        self.command_tx
            .send(LogCommand::EndTurn { turn })
            .await
            .map_err(|_| ChatError::SessionClosed)
    }

    pub async fn push_user(
        &self,
        turn: TurnId,
        content: impl Into<String>,
    ) -> Result<MessageId, ChatError> {
        let content = content.into();
        self.request(|reply| LogCommand::PushUser {
            turn,
            content,
            reply,
        })
        .await
    }

    /// Mark a user message as stored by the server under `content`.
    pub async fn acknowledge(
        &self,
        id: MessageId,
        content: impl Into<String>,
    ) -> Result<(), ChatError> {
        let content = content.into();
        Ok(self
            .request(|reply| LogCommand::Acknowledge { id, content, reply })
            .await??)
    }

    pub async fn open_assistant(&self, turn: TurnId) -> Result<MessageId, ChatError> {
        Ok(self
            .request(|reply| LogCommand::OpenAssistant { turn, reply })
            .await??)
    }

    pub async fn append(&self, id: MessageId, delta: impl Into<String>) -> Result<(), ChatError> {
        let delta = delta.into();
        Ok(self
            .request(|reply| LogCommand::Append { id, delta, reply })
            .await??)
    }

    pub async fn close(&self, id: MessageId) -> Result<(), ChatError> {
        Ok(self.request(|reply| LogCommand::Close { id, reply }).await??)
    }

    /// Replace the log with a history snapshot; returns the new length.
    pub async fn apply_history(&self, history: Vec<RemoteMessage>) -> Result<usize, ChatError> {
        self.request(|reply| LogCommand::ApplyHistory { history, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<Vec<ChatMessage>, ChatError> {
        self.request(|reply| LogCommand::Snapshot { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> LogCommand,
    ) -> Result<T, ChatError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| ChatError::SessionClosed)?;
        reply_rx.await.map_err(|_| ChatError::SessionClosed)
    }
}

async fn log_actor(
    mut log: MessageLog,
    mut command_rx: mpsc::Receiver<LogCommand>,
    events: EventBus,
    cancel: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = command_rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };
        apply(&mut log, command, &events);
    }
    debug!(messages = log.len(), "log actor stopped");
}

fn apply(log: &mut MessageLog, command: LogCommand, events: &EventBus) {
    match command {
        LogCommand::BeginTurn { reply } => {
            let _ = reply.send(log.begin_turn());
        }
        LogCommand::EndTurn { turn } => log.end_turn(turn),
        LogCommand::PushUser {
            turn,
            content,
            reply,
        } => {
            let message = log.push_user(turn, content).clone();
            let id = message.id;
            events.publish(SessionEvent::MessageAppended(message));
            let _ = reply.send(id);
        }
        LogCommand::Acknowledge { id, content, reply } => {
            let _ = reply.send(log.acknowledge(id, content));
        }
        LogCommand::OpenAssistant { turn, reply } => {
            let result = log.open_assistant(turn).map(|m| {
                events.publish(SessionEvent::MessageAppended(m.clone()));
                m.id
            });
            let _ = reply.send(result);
        }
        LogCommand::Append { id, delta, reply } => {
            let result = log.append(id, &delta);
            if result.is_ok() && !delta.is_empty() {
                events.publish(SessionEvent::ContentAppended { id, delta });
            }
            let _ = reply.send(result);
        }
        LogCommand::Close { id, reply } => {
            let result = log.close(id);
            if result.is_ok() {
                events.publish(SessionEvent::MessageClosed { id });
            }
            let _ = reply.send(result);
        }
        LogCommand::ApplyHistory { history, reply } => {
            let len = log.apply_history(history);
            events.publish(SessionEvent::HistoryReplaced { len });
            let _ = reply.send(len);
        }
        LogCommand::Snapshot { reply } => {
            let _ = reply.send(log.snapshot());
        }
    }
}

//! Ordered message log for one session.
//!
//! `MessageLog` is the plain data structure; `LogHandle` is the
//! single-writer path every async operation goes through.

mod actor;

#[cfg(test)]
mod tests;

pub use actor::LogHandle;

use std::collections::HashSet;

use tracing::warn;

use crate::message::{ChatMessage, MessageId, RemoteMessage, Sender};
use crate::LogError;

/// A locally originated exchange: a user message and/or the assistant
/// placeholder answering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(u64);

struct Entry {
    message: ChatMessage,
    turn: Option<TurnId>,
    /// Content the server stored for this user message, once it has
    /// accepted the send.
    persisted: Option<String>,
}

/// Ordered, invariant-preserving container of chat messages.
///
/// Invariants:
/// - ids are unique
/// - at most one message is open
/// - an open message only ever grows
#[derive(Default)]
pub struct MessageLog {
    entries: Vec<Entry>,
    next_local: u64,
    next_turn: u64,
    open_turns: HashSet<TurnId>,
    open: Option<MessageId>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_turn(&mut self) -> TurnId {
        self.next_turn += 1;
        let turn = TurnId(self.next_turn);
        self.open_turns.insert(turn);
        turn
    }

    /// Mark a turn finished. Its local messages become replaceable by the
    /// next history snapshot.
    pub fn end_turn(&mut self, turn: TurnId) {
        self.open_turns.remove(&turn);
    }

    pub fn push_user(&mut self, turn: TurnId, content: impl Into<String>) -> &ChatMessage {
        let id = self.mint_id();
        self.push(
            ChatMessage {
                id,
                sender: Sender::User,
                content: content.into(),
                open: false,
            },
            Some(turn),
        )
    }

    /// Record that the server has stored the user message `id` with
    /// `content`. A later snapshot that ends with that message supersedes
    /// the local copy even while its turn is still open.
    pub fn acknowledge(
        &mut self,
        id: MessageId,
        content: impl Into<String>,
    ) -> Result<(), LogError> {
        let entry = self.entry_mut(id)?;
        if entry.message.sender != Sender::User {
            return Err(LogError::NotUser(id));
        }
        entry.persisted = Some(content.into());
        Ok(())
    }

    /// Append an empty assistant placeholder and mark it open.
    pub fn open_assistant(&mut self, turn: TurnId) -> Result<&ChatMessage, LogError> {
        if let Some(open) = self.open {
            return Err(LogError::AlreadyStreaming(open));
        }
        let id = self.mint_id();
        self.open = Some(id);
        Ok(self.push(
            ChatMessage {
                id,
                sender: Sender::Assistant,
                content: String::new(),
                open: true,
            },
            Some(turn),
        ))
    }

    pub fn append(&mut self, id: MessageId, delta: &str) -> Result<(), LogError> {
        let entry = self.entry_mut(id)?;
        if !entry.message.open {
            return Err(LogError::NotOpen(id));
        }
        entry.message.content.push_str(delta);
        Ok(())
    }

    pub fn close(&mut self, id: MessageId) -> Result<(), LogError> {
        let entry = self.entry_mut(id)?;
        if !entry.message.open {
            return Err(LogError::NotOpen(id));
        }
        entry.message.open = false;
        self.open = None;
        Ok(())
    }

    /// Rebuild the log from an authoritative history snapshot.
    ///
    /// The snapshot replaces every remote message and every local message
    /// whose turn has ended. Local messages of turns still in flight are
    /// kept after the snapshot, in their original order, so a reply that
    /// is streaming while history lands is neither lost nor duplicated. An
    /// acknowledged user message is dropped when it matches the snapshot's
    /// last user message.
    pub fn apply_history(&mut self, history: Vec<RemoteMessage>) -> usize {
        let echoed = history
            .iter()
            .rev()
            .find(|m| m.sender == Sender::User)
            .map(|m| m.content.clone());
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(history.len());

        for remote in history {
            if !seen.insert(remote.id) {
                warn!(id = remote.id, "dropping duplicate history entry");
                continue;
            }
            entries.push(Entry {
                message: remote.into(),
                turn: None,
                persisted: None,
            });
        }

        let retained = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|e| e.turn.is_some_and(|t| self.open_turns.contains(&t)))
            .filter(|e| e.persisted.is_none() || e.persisted != echoed);
        entries.extend(retained);

        self.open = entries
            .iter()
            .find(|e| e.message.open)
            .map(|e| e.message.id);
        self.entries = entries;
        self.entries.len()
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.entries
            .iter()
            .map(|e| &e.message)
            .find(|m| m.id == id)
    }

    pub fn open_message(&self) -> Option<MessageId> {
        self.open
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mint_id(&mut self) -> MessageId {
        self.next_local += 1;
        MessageId::Local(self.next_local)
    }

    fn push(&mut self, message: ChatMessage, turn: Option<TurnId>) -> &ChatMessage {
        self.entries.push(Entry {
            message,
            turn,
            persisted: None,
        });
        let last = self.entries.len() - 1;
        &self.entries[last].message
    }

    fn entry_mut(&mut self, id: MessageId) -> Result<&mut Entry, LogError> {
        self.entries
            .iter_mut()
            .rev()
            .find(|e| e.message.id == id)
            .ok_or(LogError::UnknownMessage(id))
    }
}

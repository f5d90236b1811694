//! Pending first input, handed from chat creation to the chat's session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use learna_common::ChatId;

/// The prompt a chat was created with, waiting for its session to stream
/// the first reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFirstInput {
    pub prompt: String,
}

/// Chat-scoped store of pending first inputs.
///
/// `take` removes the entry, so each value is consumed at most once and a
/// session only ever sees the entry of its own chat.
#[derive(Clone, Default)]
pub struct FirstInputHandoff {
    inner: Arc<Mutex<HashMap<ChatId, PendingFirstInput>>>,
}

impl FirstInputHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, chat: ChatId, prompt: impl Into<String>) {
        self.lock().insert(
            chat,
            PendingFirstInput {
                prompt: prompt.into(),
            },
        );
    }

    pub fn take(&self, chat: ChatId) -> Option<PendingFirstInput> {
        self.lock().remove(&chat)
    }

    pub fn contains(&self, chat: ChatId) -> bool {
        self.lock().contains_key(&chat)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChatId, PendingFirstInput>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_once() {
        let handoff = FirstInputHandoff::new();
        handoff.put(ChatId::new(1), "Explain recursion");

        assert!(handoff.contains(ChatId::new(1)));
        assert_eq!(
            handoff.take(ChatId::new(1)).map(|p| p.prompt),
            Some("Explain recursion".to_string())
        );
        assert_eq!(handoff.take(ChatId::new(1)), None);
    }

    #[test]
    fn entries_are_scoped_to_their_chat() {
        let handoff = FirstInputHandoff::new();
        handoff.put(ChatId::new(1), "first");

        assert_eq!(handoff.take(ChatId::new(2)), None);
        assert!(handoff.contains(ChatId::new(1)));
    }

    #[test]
    fn clones_share_state() {
        let handoff = FirstInputHandoff::new();
        let other = handoff.clone();
        handoff.put(ChatId::new(3), "shared");
        assert!(other.take(ChatId::new(3)).is_some());
        assert!(!handoff.contains(ChatId::new(3)));
    }
}

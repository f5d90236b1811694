//! Chat message model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a message inside one session's log.
///
/// Server ids and locally minted ids live in separate spaces, so a
/// local message can never collide with one loaded from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    Remote(i64),
    Local(u64),
}

impl MessageId {
    pub fn is_local(self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Remote(id) => write!(f, "{id}"),
            MessageId::Local(id) => write!(f, "local-{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    /// Still receiving streamed text.
    pub open: bool,
}

/// One entry of the server's history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub id: i64,
    pub sender: Sender,
    pub content: String,
}

impl From<RemoteMessage> for ChatMessage {
    fn from(msg: RemoteMessage) -> Self {
        Self {
            id: MessageId::Remote(msg.id),
            sender: msg.sender,
            content: msg.content,
            open: false,
        }
    }
}

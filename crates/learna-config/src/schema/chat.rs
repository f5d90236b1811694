//! Chat defaults: selectable models, default agent, attachment policy.

use serde::{Deserialize, Serialize};

/// Chat behaviour defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Selectable models; the first one is the default for new chats.
    pub models: Vec<String>,
    /// Agent used for new chats when none is given.
    pub default_agent: String,
    /// Upload every attached file instead of only the first one.
    pub upload_all_attachments: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            models: vec!["openai/gpt-oss-20b".into()],
            default_agent: "tutor".into(),
            upload_all_attachments: false,
        }
    }
}

impl ChatConfig {
    /// The first non-blank configured model.
    pub fn default_model(&self) -> Option<&str> {
        self.models
            .iter()
            .map(|m| m.trim())
            .find(|m| !m.is_empty())
    }
}

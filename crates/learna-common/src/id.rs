use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Short hex id used to correlate log lines of one submission or bootstrap.
pub fn new_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Server-assigned chat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(i64);

impl ChatId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatId {
    type Err = std::num::ParseIntError;

    /// Accepts a bare id or a chat path such as `/chat/42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let last = s.trim().trim_end_matches('/').rsplit('/').next().unwrap_or("");
        last.parse().map(Self)
    }
}

//! Remote chat gateway connection settings.

use serde::{Deserialize, Serialize};

/// Where the chat REST API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL; endpoint paths (`api/chat`, ...) are joined onto it.
    pub base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/".into(),
        }
    }
}

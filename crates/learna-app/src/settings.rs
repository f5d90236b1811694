//! Translate the loaded config into chat-core settings.

use learna_chat::{HttpGatewayConfig, SessionConfig};
use learna_config::LearnaConfig;

pub fn gateway_config(config: &LearnaConfig) -> HttpGatewayConfig {
    HttpGatewayConfig {
        base_url: config.gateway.base_url.clone(),
        connect_timeout: config.timeouts.connect(),
        request_timeout: config.timeouts.request(),
    }
}

pub fn session_config(config: &LearnaConfig) -> SessionConfig {
    let defaults = SessionConfig::default();
    SessionConfig {
        default_model: config
            .chat
            .default_model()
            .map(String::from)
            .unwrap_or(defaults.default_model),
        default_agent: config.chat.default_agent.clone(),
        chunk_idle: config.timeouts.chunk_idle(),
        upload_all_attachments: config.chat.upload_all_attachments,
    }
}

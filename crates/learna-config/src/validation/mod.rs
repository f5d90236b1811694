//! Full configuration validation.
//!
//! Each check pushes a message into a shared list; the orchestrator
//! collects them into a single `ConfigError`.

mod helpers;


use crate::schema::LearnaConfig;
use helpers::validate_range;
use learna_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LearnaConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_gateway(&mut errors, config);
    validate_chat(&mut errors, config);
    validate_timeouts(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_gateway(errors: &mut Vec<String>, config: &LearnaConfig) {
    let url = config.gateway.base_url.trim();
    if url.is_empty() {
        errors.push("gateway.base_url is empty".into());
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("gateway.base_url = {url} must be an http(s) URL"));
    }
}

fn validate_chat(errors: &mut Vec<String>, config: &LearnaConfig) {
    let models = &config.chat.models;
    if models.is_empty() {
        errors.push("chat.models must list at least one model".into());
    }
    for (i, model) in models.iter().enumerate() {
        if model.trim().is_empty() {
            errors.push(format!("chat.models[{i}] is blank"));
        }
    }
}

fn validate_timeouts(errors: &mut Vec<String>, config: &LearnaConfig) {
    let t = &config.timeouts;
    validate_range(errors, "timeouts.connect_secs", t.connect_secs, 1, 120);
    validate_range(errors, "timeouts.request_secs", t.request_secs, 1, 600);
    validate_range(errors, "timeouts.chunk_idle_secs", t.chunk_idle_secs, 1, 3600);
}

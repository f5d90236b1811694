//! Reading `config.toml` and layering the environment over it.

use std::io::ErrorKind;
use std::path::Path;

use learna_common::ConfigError;
use tracing::{debug, info};

use super::paths::{create_default_config, default_config_path};
use crate::schema::LearnaConfig;
use crate::validation;

/// Environment variable overriding `gateway.base_url`.
pub const ENV_BACKEND_URL: &str = "LEARNA_BACKEND_URL";
/// Environment variable overriding `chat.models` (comma-separated).
pub const ENV_MODELS: &str = "LEARNA_MODELS";

/// Parse a config file. Missing fields take their defaults; the result is
/// not validated yet because the environment may still change it.
pub fn load_from_path(path: &Path) -> Result<LearnaConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("failed to read {}: {e}", path.display())),
    })?;

    let config: LearnaConfig = toml::from_str(&content).map_err(|e| {
        ConfigError::ParseError(format!("failed to parse {}: {e}", path.display()))
    })?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load `config.toml` from the platform config directory, writing the
/// documented template first if there is none.
pub fn load_default() -> Result<LearnaConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(LearnaConfig::default());
    }

    load_from_path(&path)
}

/// Apply environment overrides, then validate the merged config. Each
/// override is logged with the variable it came from.
pub fn resolve(
    mut config: LearnaConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<LearnaConfig, ConfigError> {
    apply_env_overrides(&mut config, lookup);
    validation::validate(&config)?;
    Ok(config)
}

/// Apply environment overrides through a lookup function. Blank values
/// are ignored.
pub fn apply_env_overrides(config: &mut LearnaConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
        let url = url.trim();
        info!(source = ENV_BACKEND_URL, url, "gateway.base_url overridden");
        config.gateway.base_url = url.to_string();
    }

    if let Some(raw) = lookup(ENV_MODELS) {
        let models: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();
        if models.is_empty() {
            debug!(source = ENV_MODELS, "ignoring empty model override");
        } else {
            info!(source = ENV_MODELS, count = models.len(), "chat.models overridden");
            config.chat.models = models;
        }
    }
}

//! Learna client configuration.
//!
//! Provides TOML-based configuration for the chat gateway, streaming
//! timeouts and logging, plus the persisted bearer-token store. All
//! config sections use sensible defaults so partial configs work out of
//! the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use learna_config::{config_to_json, load_config};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod credentials;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use credentials::CredentialStore;
pub use schema::{LearnaConfig, CONFIG_SCHEMA_VERSION};

use learna_common::ConfigError;
use std::path::Path;

pub use toml_loader::{apply_env_overrides, ENV_BACKEND_URL, ENV_MODELS};

/// Convenience function to load config from the platform default path.
///
/// Loads `config.toml` from the OS config directory, creates a default
/// if none exists, applies environment overrides, and validates the result.
pub fn load_config() -> Result<LearnaConfig, ConfigError> {
    toml_loader::resolve(toml_loader::load_default()?, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] but reads an explicit file, which must exist.
pub fn load_config_from(path: &Path) -> Result<LearnaConfig, ConfigError> {
    toml_loader::resolve(toml_loader::load_from_path(path)?, |key| std::env::var(key).ok())
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &LearnaConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

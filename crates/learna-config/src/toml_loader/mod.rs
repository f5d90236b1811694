//! TOML config file loading, creation and environment overrides.

mod loader;
mod paths;
mod template;


pub use loader::{
    apply_env_overrides, load_default, load_from_path, resolve, ENV_BACKEND_URL, ENV_MODELS,
};
pub use paths::{config_dir, create_default_config, default_config_path};

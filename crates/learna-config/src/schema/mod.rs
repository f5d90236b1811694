//! Configuration schema types for the Learna client.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod chat;
mod gateway;
mod system;

pub use chat::*;
pub use gateway::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for the Learna client.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct LearnaConfig {
    pub gateway: GatewayConfig,
    pub chat: ChatConfig,
    pub timeouts: TimeoutsConfig,
    pub logging: LoggingConfig,
}

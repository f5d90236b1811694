//! System configuration types: network timeouts and logging.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Network and stream timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// TCP/TLS connect budget (valid range: 1-120).
    pub connect_secs: u64,
    /// Budget until response headers arrive (valid range: 1-600).
    pub request_secs: u64,
    /// Maximum silence between two stream chunks (valid range: 1-3600).
    pub chunk_idle_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
            chunk_idle_secs: 120,
        }
    }
}

impl TimeoutsConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn chunk_idle(&self) -> Duration {
        Duration::from_secs(self.chunk_idle_secs)
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `tracing_subscriber::EnvFilter` directive for the learna crates.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "learna=trace",
            LogLevel::Debug => "learna=debug",
            LogLevel::Info => "learna=info",
            LogLevel::Warn => "learna=warn",
            LogLevel::Error => "learna=error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Output encoding of the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `2026-01-01T00:00:00Z  INFO message` lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format: `"text"` or `"json"`.
    #[serde(default)]
    pub format: LogFormat,
    /// Path to the append-only log file.
    #[serde(default = "default_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            file: default_file(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file() -> String {
    "logs/pulse_node.log".to_string()
}

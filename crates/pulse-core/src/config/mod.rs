//! Application configuration schemas.
//!
//! The node reads a single JSON file (`config.json` by default) through the
//! `config` crate, overlaid with environment variables prefixed with
//! `PULSE_NODE__`. Only `access_token` is required.

pub mod logging;
pub mod timing;

use std::path::Path;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;

pub use self::timing::NodeTimings;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Access token presented to the session endpoint and the stats API.
    pub access_token: String,
    /// Base WebSocket URL of the scoring service.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Protocol version announced in the session URL.
    #[serde(default = "default_version")]
    pub version: String,
    /// Reconciliation endpoint returning `points_today` and `heartbeats`.
    #[serde(default = "default_stats_url")]
    pub stats_url: String,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a JSON file plus the environment overlay.
    ///
    /// A missing file, a missing `access_token`, or an invalid URL is a
    /// [`Configuration`](crate::error::ErrorKind::Configuration) error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::configuration(format!(
                "{} not found. Please create one.",
                path.display()
            )));
        }

        let config = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(true),
            )
            .add_source(
                config::Environment::with_prefix("PULSE_NODE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every connection attempt fail.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.access_token.trim().is_empty() {
            return Err(AppError::configuration("access_token must not be empty"));
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(AppError::configuration(format!(
                "ws_url must use ws:// or wss://, got '{}'",
                self.ws_url
            )));
        }
        if !(self.stats_url.starts_with("http://") || self.stats_url.starts_with("https://")) {
            return Err(AppError::configuration(format!(
                "stats_url must use http:// or https://, got '{}'",
                self.stats_url
            )));
        }
        Ok(())
    }

    /// Session endpoint: the base URL with `accessToken` and `version` appended.
    pub fn session_url(&self) -> String {
        let separator = if self.ws_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}accessToken={}&version={}",
            self.ws_url,
            separator,
            utf8_percent_encode(&self.access_token, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.version, NON_ALPHANUMERIC),
        )
    }
}

fn default_ws_url() -> String {
    "wss://secure.ws.teneo.pro/websocket".to_string()
}

fn default_version() -> String {
    "v0.2".to_string()
}

fn default_stats_url() -> String {
    "https://api.teneo.pro/api/users/stats".to_string()
}

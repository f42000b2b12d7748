//! Dashboard stats endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use pulse_core::error::{AppError, ErrorKind};
use pulse_core::profile::{BROWSER_HEADERS, bearer};
use pulse_core::{AppConfig, AppResult};

/// Reconciliation values as reported by the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Points earned today.
    pub points_today: u64,
    /// Heartbeats counted today.
    pub heartbeats: u64,
}

/// Source of dashboard stats.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch the current values.
    async fn fetch(&self) -> AppResult<DashboardStats>;
}

/// HTTP client for the stats endpoint.
#[derive(Debug, Clone)]
pub struct HttpStatsSource {
    client: reqwest::Client,
    url: String,
}

impl HttpStatsSource {
    /// Build a client that sends the browser header set and the bearer token.
    pub fn new(config: &AppConfig, timeout: Duration) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        for &(name, value) in BROWSER_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        let mut auth = HeaderValue::from_str(&bearer(&config.access_token)).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("access_token is not a valid header value: {e}"),
                e,
            )
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Internal,
                    format!("Failed to build HTTP client: {e}"),
                    e,
                )
            })?;

        Ok(Self {
            client,
            url: config.stats_url.clone(),
        })
    }

    /// Endpoint queried by this client.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn fetch(&self) -> AppResult<DashboardStats> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Error checking dashboard stats: {e}"),
                e,
            )
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(AppError::external_service(format!(
                "Failed to fetch dashboard stats: {}",
                status.as_u16()
            )));
        }

        response.json::<DashboardStats>().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Invalid dashboard stats body: {e}"),
                e,
            )
        })
    }
}

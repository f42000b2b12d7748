//! Rate-limited reconciliation against the dashboard stats endpoint.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use pulse_realtime::MetricsStore;

use crate::stats::StatsSource;

/// Result of one [`Reconciler::maybe_refresh`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Too soon since the last attempt.
    Skipped,
    /// The store now holds fresh dashboard values.
    Updated,
    /// The fetch failed; the previous values were kept.
    Failed,
}

/// Pulls dashboard stats into the metrics store at most once per interval.
pub struct Reconciler {
    source: Arc<dyn StatsSource>,
    metrics: Arc<MetricsStore>,
    interval: Duration,
    last_attempt: Mutex<Option<Instant>>,
}

impl Reconciler {
    /// Creates a reconciler that has never fetched.
    pub fn new(source: Arc<dyn StatsSource>, metrics: Arc<MetricsStore>, interval: Duration) -> Self {
        Self {
            source,
            metrics,
            interval,
            last_attempt: Mutex::new(None),
        }
    }

    /// Fetch if `interval` has passed since the previous attempt.
    ///
    /// Failed attempts count too, so a broken endpoint is not hammered once
    /// per display tick.
    pub async fn maybe_refresh(&self) -> RefreshOutcome {
        let now = Instant::now();
        {
            let mut last = self.last_attempt.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = *last
                && now.saturating_duration_since(previous) < self.interval
            {
                return RefreshOutcome::Skipped;
            }
            *last = Some(now);
        }

        match self.source.fetch().await {
            Ok(stats) => {
                self.metrics
                    .apply_reconciliation(stats.points_today, stats.heartbeats);
                info!(
                    points_today = stats.points_today,
                    heartbeats = stats.heartbeats,
                    "Dashboard stats updated"
                );
                RefreshOutcome::Updated
            }
            Err(e) => {
                error!(error = %e, "Dashboard stats refresh failed");
                RefreshOutcome::Failed
            }
        }
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use pulse_core::{AppError, AppResult};

    use super::*;
    use crate::stats::DashboardStats;

    struct ScriptedSource {
        replies: Mutex<VecDeque<AppResult<DashboardStats>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<AppResult<DashboardStats>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl StatsSource for ScriptedSource {
        async fn fetch(&self) -> AppResult<DashboardStats> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::external_service("no reply scripted")))
        }
    }

    fn stats(points_today: u64, heartbeats: u64) -> AppResult<DashboardStats> {
        Ok(DashboardStats {
            points_today,
            heartbeats,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_respects_interval() {
        let source = ScriptedSource::new(vec![stats(150, 2), stats(225, 3)]);
        let metrics = Arc::new(MetricsStore::default());
        let reconciler = Reconciler::new(source.clone(), metrics.clone(), Duration::from_secs(60));

        assert_eq!(reconciler.maybe_refresh().await, RefreshOutcome::Updated);
        assert_eq!(metrics.snapshot().points.dashboard_points_today, 150);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(reconciler.maybe_refresh().await, RefreshOutcome::Skipped);
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(reconciler.maybe_refresh().await, RefreshOutcome::Updated);
        let points = metrics.snapshot().points;
        assert_eq!(points.dashboard_points_today, 225);
        assert_eq!(points.dashboard_heartbeats, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_values() {
        let source = ScriptedSource::new(vec![
            stats(150, 2),
            Err(AppError::external_service("Failed to fetch dashboard stats: 503")),
        ]);
        let metrics = Arc::new(MetricsStore::default());
        let reconciler = Reconciler::new(source.clone(), metrics.clone(), Duration::from_secs(60));

        reconciler.maybe_refresh().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(reconciler.maybe_refresh().await, RefreshOutcome::Failed);

        let points = metrics.snapshot().points;
        assert_eq!(points.dashboard_points_today, 150);
        assert_eq!(points.dashboard_heartbeats, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_attempt_is_rate_limited() {
        let source = ScriptedSource::new(vec![Err(AppError::external_service("down"))]);
        let metrics = Arc::new(MetricsStore::default());
        let reconciler = Reconciler::new(source.clone(), metrics, Duration::from_secs(60));

        assert_eq!(reconciler.maybe_refresh().await, RefreshOutcome::Failed);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(reconciler.maybe_refresh().await, RefreshOutcome::Skipped);
        assert_eq!(source.calls(), 1);
    }
}

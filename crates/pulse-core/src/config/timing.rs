//! Fixed cadences and quotas of the node.
//!
//! These are not read from the configuration file. They exist as a struct so
//! tests can shrink them; production always uses [`NodeTimings::default`].

use std::time::Duration;

/// Timers, quotas, and capacities shared by the connection manager and the
/// presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTimings {
    /// Interval between outbound `PING` frames while connected.
    pub ping_interval: Duration,
    /// Supervisor tick: how often the connection state is checked.
    pub supervisor_interval: Duration,
    /// Fixed delay inserted by `reconnect()` before a new attempt.
    pub reconnect_delay: Duration,
    /// Upper bound for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Minimum spacing between two locally counted heartbeats.
    pub heartbeat_interval: Duration,
    /// Heartbeats the service credits per day. Display only.
    pub max_heartbeats_per_day: u64,
    /// Points the service awards per heartbeat.
    pub points_per_heartbeat: u64,
    /// Minimum spacing between two reconciliation requests.
    pub dashboard_check_interval: Duration,
    /// Request timeout for the reconciliation endpoint.
    pub stats_request_timeout: Duration,
    /// Presenter tick.
    pub display_interval: Duration,
    /// How long shutdown waits for session tasks before abandoning them.
    pub shutdown_grace: Duration,
    /// Number of round-trip samples kept for the windowed average.
    pub latency_window: usize,
}

impl NodeTimings {
    /// Node uptime credited for a number of heartbeats.
    pub fn uptime_for(&self, heartbeats: u64) -> Duration {
        let secs = self.heartbeat_interval.as_secs().saturating_mul(heartbeats);
        Duration::from_secs(secs)
    }

    /// Heartbeats implied by a points total.
    pub fn heartbeats_for(&self, points_today: u64) -> u64 {
        points_today
            .checked_div(self.points_per_heartbeat)
            .unwrap_or(0)
    }
}

impl Default for NodeTimings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            supervisor_interval: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(900),
            max_heartbeats_per_day: 96,
            points_per_heartbeat: 75,
            dashboard_check_interval: Duration::from_secs(60),
            stats_request_timeout: Duration::from_secs(10),
            display_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(1),
            latency_window: 50,
        }
    }
}

//! Derived status values shown to the operator.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use pulse_core::NodeTimings;
use pulse_realtime::ConnectionState;
use pulse_realtime::metrics::{LatencyStats, MetricsSnapshot};

/// Everything the status block displays, computed from one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    /// Connection state at the time of the tick.
    pub state: ConnectionState,
    /// Time since the process started.
    pub runtime: Duration,
    /// Uptime credited by the service: heartbeats × heartbeat interval.
    pub node_uptime: Duration,
    /// Heartbeats implied by today's points.
    pub heartbeats_today: u64,
    /// Displayed daily cap.
    pub daily_cap: u64,
    /// `heartbeats_today / daily_cap` in percent. May exceed 100.
    pub heartbeat_rate: f64,
    /// Heartbeats counted locally from pulse timing.
    pub local_heartbeats: u64,
    /// Time until the next heartbeat can be counted; zero once due.
    pub next_heartbeat_in: Duration,
    /// Today's points according to the node.
    pub points_today: u64,
    /// Today's points according to the dashboard.
    pub dashboard_points_today: u64,
    /// Heartbeats today according to the dashboard.
    pub dashboard_heartbeats: u64,
    /// `points_today - dashboard_points_today`.
    pub points_delta: i64,
    /// Lifetime points.
    pub points_total: u64,
    /// `PING` frames sent.
    pub ping_count: u64,
    /// Latency statistics.
    pub latency: LatencyStats,
    /// Connection attempts made.
    pub connection_attempts: u64,
    /// When the last pulse arrived.
    pub last_pulse_at: Option<DateTime<Utc>>,
}

impl StatusView {
    /// Derive the view. Pure: reads the snapshot and nothing else.
    pub fn derive(snapshot: &MetricsSnapshot, state: ConnectionState, timings: &NodeTimings) -> Self {
        let points = &snapshot.points;
        let heartbeats_today = points.heartbeats;
        let daily_cap = snapshot.daily_cap;

        let heartbeat_rate = if daily_cap > 0 {
            heartbeats_today as f64 / daily_cap as f64 * 100.0
        } else {
            0.0
        };

        Self {
            state,
            runtime: snapshot.runtime,
            node_uptime: timings.uptime_for(heartbeats_today),
            heartbeats_today,
            daily_cap,
            heartbeat_rate,
            local_heartbeats: snapshot.heartbeat_count,
            next_heartbeat_in: snapshot
                .heartbeat_interval
                .saturating_sub(snapshot.since_last_heartbeat),
            points_today: points.points_today,
            dashboard_points_today: points.dashboard_points_today,
            dashboard_heartbeats: points.dashboard_heartbeats,
            points_delta: signed_delta(points.points_today, points.dashboard_points_today),
            points_total: points.points_total,
            ping_count: snapshot.ping_count,
            latency: snapshot.latency,
            connection_attempts: snapshot.connection_attempts,
            last_pulse_at: snapshot.last_pulse_at,
        }
    }
}

fn signed_delta(node: u64, dashboard: u64) -> i64 {
    let delta = i128::from(node) - i128::from(dashboard);
    delta.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

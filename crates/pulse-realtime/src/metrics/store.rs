//! Shared in-memory metrics mutated by the connection side and read by the
//! presenter.
//!
//! Counters are atomics; each logical group (points, heartbeat, latency,
//! clocks, pending ping) sits behind its own mutex. There is no cross-group
//! atomicity: a snapshot may mix values from before and after a concurrent
//! update.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use pulse_core::NodeTimings;

use super::latency::{LatencySample, LatencyStats, LatencyTracker};

/// Point totals reported by the peer in a `Connected` or `Pulse` frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTotals {
    /// Lifetime points.
    pub points_total: u64,
    /// Points earned today.
    pub points_today: u64,
}

/// Peer-reported totals alongside the independently fetched dashboard values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTally {
    /// Lifetime points reported by the peer.
    pub points_total: u64,
    /// Today's points reported by the peer.
    pub points_today: u64,
    /// `points_today / points_per_heartbeat`, recomputed on every update.
    pub heartbeats: u64,
    /// Today's points according to the stats endpoint.
    pub dashboard_points_today: u64,
    /// Heartbeats according to the stats endpoint.
    pub dashboard_heartbeats: u64,
}

/// Locally timed heartbeat counter.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatState {
    /// When the last heartbeat was counted (or the connection started).
    pub last_heartbeat_at: Instant,
    /// Heartbeats counted since the process started.
    pub count: u64,
    /// Minimum spacing between two counted heartbeats.
    pub interval: Duration,
    /// Displayed daily cap; never enforced.
    pub daily_cap: u64,
}

/// Timestamps used only to derive elapsed durations for display.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeClock {
    /// When the store was created.
    pub process_started: Instant,
    /// When the peer last confirmed a session.
    pub session_started_at: Option<DateTime<Utc>>,
    /// When the last pulse arrived.
    pub last_pulse_at: Option<DateTime<Utc>>,
}

/// The single outstanding ping.
#[derive(Debug, Clone, Copy)]
struct PendingPing {
    sent: Instant,
    sent_at: DateTime<Utc>,
}

/// Point-in-time copy of every metric the presenter needs.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Point totals from both sources.
    pub points: PointTally,
    /// Heartbeats counted locally.
    pub heartbeat_count: u64,
    /// Elapsed time since the last counted heartbeat.
    pub since_last_heartbeat: Duration,
    /// Heartbeat spacing.
    pub heartbeat_interval: Duration,
    /// Displayed daily cap.
    pub daily_cap: u64,
    /// Elapsed time since the store was created.
    pub runtime: Duration,
    /// When the peer last confirmed a session.
    pub session_started_at: Option<DateTime<Utc>>,
    /// When the last pulse arrived.
    pub last_pulse_at: Option<DateTime<Utc>>,
    /// `PING` frames sent successfully.
    pub ping_count: u64,
    /// Latency statistics.
    pub latency: LatencyStats,
    /// Connection attempts made.
    pub connection_attempts: u64,
}

/// Shared metrics store.
#[derive(Debug)]
pub struct MetricsStore {
    timings: NodeTimings,
    points: Mutex<PointTally>,
    heartbeat: Mutex<HeartbeatState>,
    latency: Mutex<LatencyTracker>,
    clock: Mutex<RuntimeClock>,
    pending_ping: Mutex<Option<PendingPing>>,
    ping_count: AtomicU64,
    connection_attempts: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MetricsStore {
    /// Create a zeroed store. The process and heartbeat clocks start now.
    pub fn new(timings: NodeTimings) -> Self {
        let now = Instant::now();
        Self {
            timings,
            points: Mutex::new(PointTally::default()),
            heartbeat: Mutex::new(HeartbeatState {
                last_heartbeat_at: now,
                count: 0,
                interval: timings.heartbeat_interval,
                daily_cap: timings.max_heartbeats_per_day,
            }),
            latency: Mutex::new(LatencyTracker::new(timings.latency_window)),
            clock: Mutex::new(RuntimeClock {
                process_started: now,
                session_started_at: None,
                last_pulse_at: None,
            }),
            pending_ping: Mutex::new(None),
            ping_count: AtomicU64::new(0),
            connection_attempts: AtomicU64::new(0),
        }
    }

    /// Timings the store was built with.
    pub fn timings(&self) -> &NodeTimings {
        &self.timings
    }

    /// Count a connection attempt. Returns the new total.
    pub fn record_connection_attempt(&self) -> u64 {
        self.connection_attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Connection attempts made so far.
    pub fn connection_attempts(&self) -> u64 {
        self.connection_attempts.load(Ordering::Relaxed)
    }

    /// Restart the heartbeat interval from `now`. Called for every new session.
    pub fn reset_heartbeat_clock(&self, now: Instant) {
        lock(&self.heartbeat).last_heartbeat_at = now;
    }

    /// Mark a `PING` as outstanding, replacing any previous one.
    pub fn begin_ping(&self, now: Instant) {
        *lock(&self.pending_ping) = Some(PendingPing {
            sent: now,
            sent_at: Utc::now(),
        });
    }

    /// Count a `PING` that reached the transport. Returns the new total.
    pub fn record_ping_sent(&self) -> u64 {
        self.ping_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Resolve the outstanding ping with a `PONG` received at `now`.
    ///
    /// Returns `None`, and records nothing, when no ping is outstanding.
    pub fn complete_ping(&self, now: Instant) -> Option<LatencySample> {
        let pending = lock(&self.pending_ping).take()?;
        let rtt = now.saturating_duration_since(pending.sent);
        let sample = LatencySample {
            rtt_ms: rtt.as_secs_f64() * 1000.0,
            sent_at: pending.sent_at,
        };
        lock(&self.latency).record(sample);
        Some(sample)
    }

    /// Whether a `PING` is waiting for its `PONG`.
    pub fn has_pending_ping(&self) -> bool {
        lock(&self.pending_ping).is_some()
    }

    /// Adopt the totals of a `Connected successfully` frame.
    pub fn apply_connected(&self, totals: PointTotals, at: DateTime<Utc>) {
        lock(&self.clock).session_started_at = Some(at);
        self.adopt_totals(totals);
    }

    /// Adopt the totals of a `Pulse from server` frame and count a heartbeat
    /// if a full interval has passed since the last one.
    ///
    /// Returns whether a heartbeat was counted.
    pub fn apply_pulse(&self, totals: PointTotals, now: Instant, at: DateTime<Utc>) -> bool {
        lock(&self.clock).last_pulse_at = Some(at);
        self.adopt_totals(totals);

        let mut heartbeat = lock(&self.heartbeat);
        if now.saturating_duration_since(heartbeat.last_heartbeat_at) >= heartbeat.interval {
            heartbeat.count += 1;
            heartbeat.last_heartbeat_at = now;
            true
        } else {
            false
        }
    }

    fn adopt_totals(&self, totals: PointTotals) {
        let mut points = lock(&self.points);
        points.points_total = totals.points_total;
        points.points_today = totals.points_today;
        points.heartbeats = self.timings.heartbeats_for(totals.points_today);
    }

    /// Overwrite the reconciliation values fetched from the stats endpoint.
    pub fn apply_reconciliation(&self, points_today: u64, heartbeats: u64) {
        let mut points = lock(&self.points);
        points.dashboard_points_today = points_today;
        points.dashboard_heartbeats = heartbeats;
    }

    /// Snapshot taken now.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Snapshot with elapsed durations measured against `now`.
    pub fn snapshot_at(&self, now: Instant) -> MetricsSnapshot {
        let points = *lock(&self.points);
        let heartbeat = *lock(&self.heartbeat);
        let clock = *lock(&self.clock);
        let latency = lock(&self.latency).stats();

        MetricsSnapshot {
            points,
            heartbeat_count: heartbeat.count,
            since_last_heartbeat: now.saturating_duration_since(heartbeat.last_heartbeat_at),
            heartbeat_interval: heartbeat.interval,
            daily_cap: heartbeat.daily_cap,
            runtime: now.saturating_duration_since(clock.process_started),
            session_started_at: clock.session_started_at,
            last_pulse_at: clock.last_pulse_at,
            ping_count: self.ping_count.load(Ordering::Relaxed),
            latency,
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new(NodeTimings::default())
    }
}

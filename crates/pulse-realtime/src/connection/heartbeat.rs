//! Outbound `PING` loop for latency measurement and keepalive.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::message::types::OutboundFrame;
use crate::metrics::MetricsStore;

use super::session::Session;

/// Run the ping loop for a session.
///
/// Sends a `PING` immediately and then every `ping_interval` while the
/// session is connected. The connected flag is checked once per iteration,
/// so the loop may run one extra tick after a disconnect. A failed send ends
/// the loop; recovery is left to the transport's error/close events.
pub async fn run_ping_loop(session: Arc<Session>, metrics: Arc<MetricsStore>, ping_interval: Duration) {
    let mut interval = time::interval(ping_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if !session.is_connected() {
            break;
        }

        // Single slot: a newer ping replaces one still waiting for its pong.
        metrics.begin_ping(Instant::now());

        if let Err(e) = session.send(&OutboundFrame::Ping).await {
            tracing::error!(session_id = %session.id, error = %e, "Ping error");
            break;
        }

        let count = metrics.record_ping_sent();
        tracing::trace!(session_id = %session.id, count, "Ping sent");
    }

    tracing::debug!("Ping loop ended for session {}", session.id);
}

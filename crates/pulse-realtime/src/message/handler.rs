//! Applies decoded inbound frames to the metrics store.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info};

use pulse_core::error::{AppError, ErrorKind};
use pulse_core::AppResult;

use crate::metrics::MetricsStore;

use super::types::{InboundEvent, InboundFrame};

/// Decodes frames from the peer and updates shared state.
#[derive(Debug, Clone)]
pub struct MessageHandler {
    metrics: Arc<MetricsStore>,
}

impl MessageHandler {
    /// Creates a handler writing into `metrics`.
    pub fn new(metrics: Arc<MetricsStore>) -> Self {
        Self { metrics }
    }

    /// Decode and apply one raw frame.
    ///
    /// A frame that is not a JSON object is a [`ErrorKind::Decode`] error and
    /// leaves the store untouched. Unknown frames are logged and discarded.
    pub fn handle(&self, raw: &str) -> AppResult<InboundEvent> {
        let frame: InboundFrame = serde_json::from_str(raw).map_err(|e| {
            AppError::with_source(ErrorKind::Decode, format!("Message parse error: {e}"), e)
        })?;

        let event = frame.classify();
        let now = Instant::now();

        match &event {
            InboundEvent::Pong => match self.metrics.complete_ping(now) {
                Some(sample) => debug!(rtt_ms = sample.rtt_ms, "Pong received"),
                None => debug!("Pong without outstanding ping ignored"),
            },
            InboundEvent::Connected(totals) => {
                self.metrics.apply_connected(*totals, Utc::now());
                info!(
                    points_total = totals.points_total,
                    points_today = totals.points_today,
                    "Connection established successfully"
                );
            }
            InboundEvent::Pulse(totals) => {
                let counted = self.metrics.apply_pulse(*totals, now, Utc::now());
                debug!(
                    points_today = totals.points_today,
                    heartbeat_counted = counted,
                    "Pulse from server"
                );
            }
            InboundEvent::Other(kind) => {
                debug!(frame_type = %kind, "Unhandled frame discarded");
            }
        }

        Ok(event)
    }
}

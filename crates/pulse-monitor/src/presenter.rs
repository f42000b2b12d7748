//! One-second display loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use pulse_core::NodeTimings;
use pulse_realtime::{ConnectionManager, MetricsStore};

use crate::reconciler::{Reconciler, RefreshOutcome};
use crate::render::status_lines;
use crate::sink::StatusSink;
use crate::view::StatusView;

/// Reads shared state on a fixed tick and hands the rendered block to a sink.
///
/// The presenter never writes connection or metrics state itself; the only
/// write it triggers is the reconciler's dashboard update.
pub struct Presenter {
    manager: Arc<ConnectionManager>,
    metrics: Arc<MetricsStore>,
    reconciler: Option<Arc<Reconciler>>,
    timings: NodeTimings,
    refresh: Option<JoinHandle<RefreshOutcome>>,
}

impl Presenter {
    /// Presenter over `manager`'s state; without a reconciler the dashboard values stay as they are.
    pub fn new(manager: Arc<ConnectionManager>, reconciler: Option<Arc<Reconciler>>) -> Self {
        let metrics = manager.metrics().clone();
        let timings = *metrics.timings();
        Self {
            manager,
            metrics,
            reconciler,
            timings,
            refresh: None,
        }
    }

    /// Start a reconciliation in the background unless one is running.
    fn kick_reconciler(&mut self) {
        let Some(reconciler) = &self.reconciler else {
            return;
        };
        if self.refresh.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let reconciler = reconciler.clone();
        self.refresh = Some(tokio::spawn(async move { reconciler.maybe_refresh().await }));
    }

    /// One tick: reconcile if due, derive the view, render it.
    pub fn tick(&mut self, sink: &mut dyn StatusSink) -> StatusView {
        self.kick_reconciler();

        let view = StatusView::derive(&self.metrics.snapshot(), self.manager.state(), &self.timings);
        if let Err(e) = sink.show(&status_lines(&view)) {
            warn!(error = %e, "Failed to draw status");
        }
        view
    }

    /// Tick every `display_interval` until `shutdown` turns true, then
    /// release the sink.
    pub async fn run(mut self, mut sink: Box<dyn StatusSink>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.timings.display_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_ms = self.timings.display_interval.as_millis() as u64,
            "Presenter started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(sink.as_mut());
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(refresh) = self.refresh.take() {
            refresh.abort();
        }
        if let Err(e) = sink.finish() {
            warn!(error = %e, "Failed to release display");
        }
        debug!("Presenter stopped");
    }
}

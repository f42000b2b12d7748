//! Connection manager: single-session lifecycle, transport event routing and
//! the fixed-delay reconnect supervisor.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use pulse_core::NodeTimings;

use crate::message::handler::MessageHandler;
use crate::metrics::MetricsStore;

use super::heartbeat::run_ping_loop;
use super::session::{Session, SessionId};
use super::state::ConnectionState;
use super::transport::{SessionRequest, Transport, TransportEvent};

/// Observable state plus the id of the session that may change it.
#[derive(Debug, Clone, Copy, Default)]
struct Status {
    state: ConnectionState,
    session_id: Option<SessionId>,
}

/// Owns the one session with the scoring service.
///
/// Session create / replace / close happen under a single async lock. The
/// observable [`ConnectionState`] sits behind a short synchronous lock so
/// transport events and the presenter can read or flip it without waiting
/// for a transition in progress.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    request: SessionRequest,
    metrics: Arc<MetricsStore>,
    handler: MessageHandler,
    timings: NodeTimings,
    lifecycle: AsyncMutex<Option<Arc<Session>>>,
    status: Mutex<Status>,
    closed: AtomicBool,
}

impl ConnectionManager {
    /// Creates a manager. Nothing is opened until [`connect`](Self::connect).
    pub fn new(
        transport: Arc<dyn Transport>,
        request: SessionRequest,
        metrics: Arc<MetricsStore>,
    ) -> Self {
        Self {
            transport,
            request,
            handler: MessageHandler::new(metrics.clone()),
            timings: *metrics.timings(),
            metrics,
            lifecycle: AsyncMutex::new(None),
            status: Mutex::new(Status::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    /// Whether the current session is open.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Shared metrics written by this manager.
    pub fn metrics(&self) -> &Arc<MetricsStore> {
        &self.metrics
    }

    /// The session most recently created, if it has not been retired.
    pub async fn current_session(&self) -> Option<Arc<Session>> {
        self.lifecycle.lock().await.clone()
    }

    fn status(&self) -> Status {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, state: ConnectionState, session_id: Option<SessionId>) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.state = state;
        status.session_id = session_id;
    }

    /// Move to `state` only if `session` is still the current one.
    fn transition_for(&self, session: &Session, state: ConnectionState) -> bool {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        if status.session_id != Some(session.id) {
            return false;
        }
        status.state = state;
        true
    }

    fn is_current(&self, session: &Session) -> bool {
        self.status().session_id == Some(session.id)
    }

    /// Start a new session unless one is already connecting or connected.
    ///
    /// Returns `true` when an attempt was started. The handshake runs in a
    /// spawned task; this does not wait for the peer.
    pub async fn connect(self: &Arc<Self>) -> bool {
        let mut lifecycle = self.lifecycle.lock().await;

        if self.closed.load(Ordering::SeqCst) {
            debug!("Connect skipped: manager is shut down");
            return false;
        }
        if self.state() != ConnectionState::Disconnected {
            debug!(state = %self.state(), "Connect skipped: session already active");
            return false;
        }

        let attempt = self.metrics.record_connection_attempt();
        let session = Arc::new(Session::new(attempt));
        self.set_status(ConnectionState::Connecting, Some(session.id));
        self.metrics.reset_heartbeat_clock(Instant::now());

        if let Some(previous) = lifecycle.replace(session.clone()) {
            self.retire(&previous).await;
        }

        let driver = tokio::spawn(self.clone().drive(session.clone()));
        session.track(driver);

        info!(
            session_id = %session.id,
            attempt,
            endpoint = %self.request.endpoint(),
            "New connection initiated"
        );
        true
    }

    /// Retire the current session, wait the fixed delay, then connect if
    /// nothing else has in the meantime.
    pub async fn reconnect(self: &Arc<Self>) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            let previous = lifecycle.take();
            self.set_status(ConnectionState::Disconnected, None);
            if let Some(previous) = previous {
                self.retire(&previous).await;
            }
        }

        info!(
            delay_secs = self.timings.reconnect_delay.as_secs(),
            "Attempting to reconnect"
        );
        time::sleep(self.timings.reconnect_delay).await;

        if self.state() == ConnectionState::Disconnected {
            self.connect().await
        } else {
            false
        }
    }

    /// Reconnect supervisor.
    ///
    /// Every `supervisor_interval`, a disconnected manager either connects
    /// for the first time or reconnects after the fixed delay. Retries never
    /// stop on their own; only `shutdown` ends the loop.
    pub async fn supervise(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.timings.supervisor_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Connection supervisor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.state() != ConnectionState::Disconnected {
                        continue;
                    }
                    let has_previous = self.lifecycle.lock().await.is_some();
                    if !has_previous {
                        self.connect().await;
                        continue;
                    }
                    tokio::select! {
                        _ = self.reconnect() => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Connection supervisor stopped");
    }

    /// Close the current session and refuse further connects.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let mut lifecycle = self.lifecycle.lock().await;
        let previous = lifecycle.take();
        self.set_status(ConnectionState::Disconnected, None);
        if let Some(previous) = previous {
            self.retire(&previous).await;
        }

        info!("Connection manager shut down");
    }

    /// Best-effort close, then a bounded join of the session's tasks.
    async fn retire(&self, session: &Session) {
        if let Err(e) = session.close().await {
            debug!(session_id = %session.id, error = %e, "Close failed; session dropped");
        }
        session.join(self.timings.shutdown_grace).await;
    }

    /// Open the transport for `session` and route its events until it ends.
    async fn drive(self: Arc<Self>, session: Arc<Session>) {
        let channel = match self.transport.open(&self.request).await {
            Ok(channel) => channel,
            Err(e) => {
                self.on_error(&session, &e.to_string());
                return;
            }
        };

        session.attach(channel.sink.clone());
        if !self.is_current(&session) {
            debug!(session_id = %session.id, "Session replaced during handshake");
            let _ = session.close().await;
            return;
        }

        let mut events = channel.events;
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Open => self.on_open(&session),
                TransportEvent::Message(raw) => self.on_message(&session, &raw),
                TransportEvent::Error(e) => self.on_error(&session, &e),
                TransportEvent::Closed { code, reason } => {
                    self.on_close(&session, code, &reason);
                    return;
                }
            }
        }

        self.on_close(&session, None, "event stream ended");
    }

    /// The transport reported `session` ready: go `Connected` and start pinging.
    pub fn on_open(&self, session: &Arc<Session>) {
        if !self.transition_for(session, ConnectionState::Connected) {
            debug!(session_id = %session.id, "Open from stale session ignored");
            return;
        }
        session.mark_connected();

        let ping = tokio::spawn(run_ping_loop(
            session.clone(),
            self.metrics.clone(),
            self.timings.ping_interval,
        ));
        session.track(ping);

        info!(session_id = %session.id, attempt = session.attempt, "WebSocket connection opened");
    }

    /// A text frame arrived on `session`.
    pub fn on_message(&self, session: &Session, raw: &str) {
        if !self.is_current(session) {
            debug!(session_id = %session.id, "Frame from stale session dropped");
            return;
        }
        if let Err(e) = self.handler.handle(raw) {
            error!(session_id = %session.id, error = %e, "Failed to handle frame");
        }
    }

    /// The transport failed. Only the current session moves the state.
    pub fn on_error(&self, session: &Session, err: &str) {
        session.mark_disconnected();
        if self.transition_for(session, ConnectionState::Disconnected) {
            error!(session_id = %session.id, error = %err, "WebSocket error");
        } else {
            debug!(session_id = %session.id, error = %err, "Error from stale session ignored");
        }
    }

    /// The session closed. Only the current session moves the state.
    pub fn on_close(&self, session: &Session, code: Option<u16>, reason: &str) {
        session.mark_disconnected();
        if self.transition_for(session, ConnectionState::Disconnected) {
            warn!(session_id = %session.id, code = ?code, reason = %reason, "WebSocket connection closed");
        } else {
            debug!(session_id = %session.id, code = ?code, "Close from stale session ignored");
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status();
        f.debug_struct("ConnectionManager")
            .field("request", &self.request)
            .field("state", &status.state)
            .field("session_id", &status.session_id)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;

use pulse_core::{AppConfig, NodeTimings};

/// Frame the scoring service sends right after the upgrade.
pub const HELLO: &str =
    r#"{"message":"Connected successfully","pointsTotal":52000,"pointsToday":150}"#;

/// Periodic status frame.
pub const PULSE: &str = r#"{"message":"Pulse from server","pointsTotal":52075,"pointsToday":225}"#;

/// Local stand-in for the scoring service and its stats API.
///
/// The first session is closed by the server after its first `PONG`; later
/// sessions stay open.
pub struct TestService {
    pub addr: SocketAddr,
    sessions: Arc<AtomicUsize>,
    pings: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct ServiceState {
    sessions: Arc<AtomicUsize>,
    pings: Arc<AtomicUsize>,
}

impl TestService {
    pub async fn spawn() -> Self {
        let state = ServiceState {
            sessions: Arc::new(AtomicUsize::new(0)),
            pings: Arc::new(AtomicUsize::new(0)),
        };
        let app = Router::new()
            .route("/websocket", get(ws_handler))
            .route(
                "/api/users/stats",
                get(|| async { axum::Json(serde_json::json!({"points_today": 150, "heartbeats": 2})) }),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            sessions: state.sessions,
            pings: state.pings,
        }
    }

    /// Sessions accepted so far.
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// `PING` frames received so far, across sessions.
    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Client configuration pointing at this service.
    pub fn config(&self) -> AppConfig {
        serde_json::from_value(serde_json::json!({
            "access_token": "integration-token",
            "ws_url": format!("ws://{}/websocket", self.addr),
            "stats_url": format!("http://{}/api/users/stats", self.addr),
        }))
        .expect("Failed to build test config")
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServiceState>) -> Response {
    ws.on_upgrade(move |socket| serve_session(socket, state))
}

async fn serve_session(mut socket: WebSocket, state: ServiceState) {
    let number = state.sessions.fetch_add(1, Ordering::SeqCst) + 1;

    for frame in [HELLO, PULSE] {
        if socket.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else {
            continue;
        };
        if !text.as_str().contains("PING") {
            continue;
        }
        state.pings.fetch_add(1, Ordering::SeqCst);
        if socket
            .send(Message::Text(r#"{"type":"PONG"}"#.into()))
            .await
            .is_err()
        {
            return;
        }
        if number == 1 {
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: 4000,
                    reason: "rotating".into(),
                })))
                .await;
            return;
        }
    }
}

/// Production timings with every cadence shrunk for tests.
pub fn fast_timings() -> NodeTimings {
    NodeTimings {
        ping_interval: Duration::from_millis(200),
        supervisor_interval: Duration::from_millis(100),
        reconnect_delay: Duration::from_millis(100),
        connect_timeout: Duration::from_secs(2),
        dashboard_check_interval: Duration::from_secs(60),
        display_interval: Duration::from_millis(50),
        shutdown_grace: Duration::from_millis(200),
        ..NodeTimings::default()
    }
}

/// Poll `condition` every 20ms until it holds or `limit` passes.
pub async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}

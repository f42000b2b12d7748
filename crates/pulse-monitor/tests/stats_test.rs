//! Stats client against a local axum server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use pulse_core::AppConfig;
use pulse_core::error::ErrorKind;
use pulse_core::profile::DASHBOARD_ORIGIN;
use pulse_monitor::{DashboardStats, HttpStatsSource, StatsSource};

#[derive(Clone, Default)]
struct ServerState {
    hits: Arc<AtomicUsize>,
}

async fn stats_handler(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
    let origin = headers.get("origin").and_then(|v| v.to_str().ok());
    if auth != Some("Bearer tok") || origin != Some(DASHBOARD_ORIGIN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    axum::Json(serde_json::json!({ "points_today": 150, "heartbeats": 2, "extra": true }))
        .into_response()
}

async fn spawn_server() -> (SocketAddr, ServerState) {
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/users/stats", get(stats_handler))
        .route(
            "/api/broken",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        )
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

fn source(token: &str, url: String) -> HttpStatsSource {
    let config: AppConfig = serde_json::from_value(serde_json::json!({
        "access_token": token,
        "stats_url": url,
    }))
    .expect("config");
    HttpStatsSource::new(&config, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn test_fetch_sends_auth_and_parses_body() {
    let (addr, state) = spawn_server().await;
    let stats = source("tok", format!("http://{addr}/api/users/stats"))
        .fetch()
        .await
        .expect("stats");

    assert_eq!(
        stats,
        DashboardStats {
            points_today: 150,
            heartbeats: 2
        }
    );
    assert_eq!(state.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_200_is_external_service_error() {
    let (addr, _) = spawn_server().await;

    let err = source("wrong", format!("http://{addr}/api/users/stats"))
        .fetch()
        .await
        .expect_err("unauthorized");
    assert_eq!(err.kind, ErrorKind::ExternalService);
    assert!(err.message.contains("401"));

    let err = source("tok", format!("http://{addr}/api/broken"))
        .fetch()
        .await
        .expect_err("unavailable");
    assert!(err.message.contains("503"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_external_service_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = source("tok", format!("http://{addr}/api/users/stats"))
        .fetch()
        .await
        .expect_err("connection refused");
    assert_eq!(err.kind, ErrorKind::ExternalService);
}

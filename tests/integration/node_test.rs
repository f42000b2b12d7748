//! Full node lifecycle over a real socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use pulse_monitor::{HeadlessSink, HttpStatsSource, Presenter, Reconciler};
use pulse_realtime::{ConnectionManager, ConnectionState, MetricsStore, SessionRequest, WsTransport};

use crate::helpers::{TestService, eventually, fast_timings};

#[tokio::test]
async fn test_node_connects_measures_and_reconnects() {
    let service = TestService::spawn().await;
    let config = service.config();
    let timings = fast_timings();

    let metrics = Arc::new(MetricsStore::new(timings));
    let manager = Arc::new(ConnectionManager::new(
        Arc::new(WsTransport::new(timings.connect_timeout)),
        SessionRequest::from_config(&config),
        metrics.clone(),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor = tokio::spawn(manager.clone().supervise(shutdown_rx));

    // Connected + Pulse frames adopted from the first session.
    assert!(
        eventually(Duration::from_secs(5), || {
            metrics.snapshot().points.points_today >= 150
        })
        .await,
        "no totals adopted"
    );
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.points.heartbeats, snapshot.points.points_today / 75);
    assert!(snapshot.session_started_at.is_some());

    // The server closes the first session after one PONG; the supervisor
    // opens a second one.
    assert!(
        eventually(Duration::from_secs(5), || service.sessions() >= 2).await,
        "no reconnect"
    );
    assert!(
        eventually(Duration::from_secs(5), || manager.state() == ConnectionState::Connected).await,
        "second session never opened"
    );
    assert_eq!(metrics.connection_attempts(), 2);

    assert!(
        eventually(Duration::from_secs(5), || metrics.snapshot().latency.samples >= 2).await,
        "no latency samples"
    );
    let latency = metrics.snapshot().latency;
    assert!(latency.min <= latency.average && latency.average <= latency.max);
    assert!(service.pings() >= 2);

    shutdown_tx.send(true).expect("send shutdown");
    tokio::time::timeout(Duration::from_secs(5), supervisor)
        .await
        .expect("supervisor stopped")
        .expect("supervisor panicked");
    manager.shutdown().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!manager.connect().await);
}

#[tokio::test]
async fn test_presenter_reconciles_against_stats_endpoint() {
    let service = TestService::spawn().await;
    let config = service.config();
    let timings = fast_timings();

    let metrics = Arc::new(MetricsStore::new(timings));
    let manager = Arc::new(ConnectionManager::new(
        Arc::new(WsTransport::new(timings.connect_timeout)),
        SessionRequest::from_config(&config),
        metrics.clone(),
    ));
    let stats = HttpStatsSource::new(&config, timings.stats_request_timeout).expect("stats client");
    let reconciler = Arc::new(Reconciler::new(
        Arc::new(stats),
        metrics.clone(),
        timings.dashboard_check_interval,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let presenter = Presenter::new(manager.clone(), Some(reconciler));
    let display = tokio::spawn(presenter.run(Box::new(HeadlessSink::new()), shutdown_rx));

    assert!(
        eventually(Duration::from_secs(5), || {
            metrics.snapshot().points.dashboard_points_today == 150
        })
        .await,
        "dashboard stats never applied"
    );
    assert_eq!(metrics.snapshot().points.dashboard_heartbeats, 2);
    // The presenter only reads connection state.
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(metrics.connection_attempts(), 0);

    shutdown_tx.send(true).expect("send shutdown");
    tokio::time::timeout(Duration::from_secs(5), display)
        .await
        .expect("presenter stopped")
        .expect("presenter panicked");
}

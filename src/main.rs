//! Pulse Node: keeps a scoring-service session alive and shows its status.
//!
//! Main entry point that wires the crates together and runs until interrupted.

use std::fs::OpenOptions;
use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing_subscriber::{EnvFilter, fmt};

use pulse_core::config::logging::{LogFormat, LoggingConfig};
use pulse_core::error::{AppError, ErrorKind};
use pulse_core::{AppConfig, AppResult, NodeTimings};
use pulse_monitor::{HeadlessSink, HttpStatsSource, Presenter, Reconciler, StatusSink, TerminalPanel};
use pulse_realtime::{ConnectionManager, MetricsStore, SessionRequest, WsTransport};

/// Exit status after an operator interrupt.
const EXIT_INTERRUPTED: i32 = 130;

/// Shared deadline for stopping the presenter, the supervisor and the session.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "pulse-node", version, about = "Keep a scoring-service session alive")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Override `logging.file` from the configuration.
    #[arg(long)]
    log_file: Option<String>,

    /// Log the status block instead of drawing the terminal panel.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(file) = cli.log_file.clone() {
        config.logging.file = file;
    }

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    match run(config, cli.headless).await {
        Ok(()) => std::process::exit(EXIT_INTERRUPTED),
        Err(e) => {
            tracing::error!("Critical error: {}", e);
            eprintln!("Critical error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Initialize tracing into the append-only log file.
///
/// Nothing is written to stdout; the terminal belongs to the status panel.
fn init_logging(logging: &LoggingConfig) -> AppResult<()> {
    let path = Path::new(&logging.file);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    let installed = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| AppError::new(ErrorKind::Internal, format!("Subscriber already set: {e}")))
}

/// Run until an interrupt, then shut everything down in order.
async fn run(config: AppConfig, headless: bool) -> AppResult<()> {
    tracing::info!("Initializing pulse node v{}", env!("CARGO_PKG_VERSION"));

    let timings = NodeTimings::default();
    let metrics = Arc::new(MetricsStore::new(timings));

    let request = SessionRequest::from_config(&config);
    tracing::info!(endpoint = %request.endpoint(), "Session endpoint configured");
    let transport = Arc::new(WsTransport::new(timings.connect_timeout));
    let manager = Arc::new(ConnectionManager::new(transport, request, metrics.clone()));

    let stats = HttpStatsSource::new(&config, timings.stats_request_timeout)?;
    tracing::info!(url = %stats.url(), "Reconciliation source configured");
    let reconciler = Arc::new(Reconciler::new(
        Arc::new(stats),
        metrics.clone(),
        timings.dashboard_check_interval,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut supervisor = tokio::spawn(manager.clone().supervise(shutdown_rx.clone()));

    let sink = open_sink(headless);
    let presenter = Presenter::new(manager.clone(), Some(reconciler));
    let mut display = tokio::spawn(presenter.run(sink, shutdown_rx));

    let failure = wait_for_stop(shutdown_signal(), &mut supervisor, &mut display).await;
    match &failure {
        None => tracing::info!("Shutdown signal received, starting graceful shutdown..."),
        Some(e) => tracing::error!("{}, shutting down", e),
    }
    let _ = shutdown_tx.send(true);

    // The presenter restores the terminal before anything else is torn down.
    let deadline = Instant::now() + SHUTDOWN_DEADLINE;
    stop_task("Presenter", &mut display, deadline).await;
    stop_task("Supervisor", &mut supervisor, deadline).await;
    if tokio::time::timeout_at(deadline, manager.shutdown()).await.is_err() {
        tracing::warn!("Session did not close in time");
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        runtime_secs = snapshot.runtime.as_secs(),
        pings = snapshot.ping_count,
        attempts = snapshot.connection_attempts,
        "Pulse node stopped"
    );
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Wait for `signal` or for either background task to end on its own.
///
/// Returns `None` on the signal. Both tasks run until shutdown, so any other
/// completion is an error.
async fn wait_for_stop(
    signal: impl Future<Output = ()>,
    supervisor: &mut JoinHandle<()>,
    display: &mut JoinHandle<()>,
) -> Option<AppError> {
    tokio::select! {
        _ = signal => None,
        res = supervisor => Some(task_ended("Supervisor", res)),
        res = display => Some(task_ended("Presenter", res)),
    }
}

fn task_ended(name: &str, res: Result<(), JoinError>) -> AppError {
    match res {
        Ok(()) => AppError::new(ErrorKind::Internal, format!("{name} stopped unexpectedly")),
        Err(e) => AppError::new(ErrorKind::Internal, format!("{name} task failed: {e}")),
    }
}

/// Wait for `task` until `deadline`; a task that already ended is skipped.
async fn stop_task(name: &str, task: &mut JoinHandle<()>, deadline: Instant) {
    if task.is_finished() {
        return;
    }
    if tokio::time::timeout_at(deadline, &mut *task).await.is_err() {
        tracing::warn!("{} did not stop in time", name);
        task.abort();
    }
}

/// The terminal panel when stdout is a terminal, otherwise the log sink.
fn open_sink(headless: bool) -> Box<dyn StatusSink> {
    if headless {
        return Box::new(HeadlessSink::new());
    }
    if !std::io::stdout().is_terminal() {
        tracing::warn!("stdout is not a terminal; running headless");
        return Box::new(HeadlessSink::new());
    }
    match TerminalPanel::enter() {
        Ok(panel) => Box::new(panel),
        Err(e) => {
            tracing::warn!("Terminal panel unavailable, running headless: {}", e);
            Box::new(HeadlessSink::new())
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

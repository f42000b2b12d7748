//! # pulse-monitor
//!
//! Read-only side of the pulse node. Provides:
//!
//! - The reconciliation client for the dashboard stats endpoint
//! - Status view derivation from a metrics snapshot
//! - Pure text rendering of the status block
//! - Output sinks: a ratatui terminal panel and a headless log sink
//! - The one-second presenter loop tying them together

pub mod format;
pub mod presenter;
pub mod reconciler;
pub mod render;
pub mod sink;
pub mod stats;
pub mod terminal;
pub mod view;

pub use presenter::Presenter;
pub use reconciler::Reconciler;
pub use sink::{HeadlessSink, StatusSink};
pub use stats::{DashboardStats, HttpStatsSource, StatsSource};
pub use terminal::TerminalPanel;
pub use view::StatusView;

//! Live node metrics.

pub mod latency;
pub mod store;

pub use latency::{LatencySample, LatencyStats, LatencyTracker};
pub use store::{MetricsSnapshot, MetricsStore, PointTally, PointTotals};

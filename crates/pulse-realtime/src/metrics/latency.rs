//! Round-trip latency tracking over a bounded sample window.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of samples kept for the windowed average.
pub const DEFAULT_WINDOW: usize = 50;

/// One `PING` → `PONG` round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    /// Round-trip duration in milliseconds.
    pub rtt_ms: f64,
    /// When the `PING` that produced this sample was sent.
    pub sent_at: DateTime<Utc>,
}

/// Derived latency statistics. `None` until the first sample arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Most recent sample.
    pub current: Option<f64>,
    /// Mean over the current window.
    pub average: Option<f64>,
    /// Lowest sample ever seen.
    pub min: Option<f64>,
    /// Highest sample ever seen.
    pub max: Option<f64>,
    /// Samples currently in the window.
    pub samples: usize,
}

/// Sliding window of recent round trips.
///
/// The window is FIFO with a fixed capacity. `min`/`max` are all-time and
/// survive eviction; the average only covers what is still in the window.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    window: VecDeque<LatencySample>,
    capacity: usize,
    current: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    average: Option<f64>,
}

impl LatencyTracker {
    /// Create an empty tracker holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            current: None,
            min: None,
            max: None,
            average: None,
        }
    }

    /// Record a sample, evicting the oldest if the window is full.
    pub fn record(&mut self, sample: LatencySample) {
        let rtt = sample.rtt_ms;

        self.current = Some(rtt);
        self.min = Some(self.min.map_or(rtt, |m| m.min(rtt)));
        self.max = Some(self.max.map_or(rtt, |m| m.max(rtt)));

        self.window.push_back(sample);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        let sum: f64 = self.window.iter().map(|s| s.rtt_ms).sum();
        self.average = Some(sum / self.window.len() as f64);
    }

    /// Current statistics.
    pub fn stats(&self) -> LatencyStats {
        LatencyStats {
            current: self.current,
            average: self.average,
            min: self.min,
            max: self.max,
            samples: self.window.len(),
        }
    }

    /// Samples in the window, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &LatencySample> {
        self.window.iter()
    }

    /// Maximum number of samples held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rtt_ms: f64) -> LatencySample {
        LatencySample {
            rtt_ms,
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_tracker_has_no_stats() {
        let tracker = LatencyTracker::default();
        let stats = tracker.stats();
        assert_eq!(stats, LatencyStats::default());
        assert!(stats.min.is_none());
    }

    #[test]
    fn test_min_max_mean() {
        let mut tracker = LatencyTracker::default();
        for rtt in [100.0, 200.0, 300.0] {
            tracker.record(sample(rtt));
        }

        let stats = tracker.stats();
        assert_eq!(stats.min, Some(100.0));
        assert_eq!(stats.max, Some(300.0));
        assert_eq!(stats.average, Some(200.0));
        assert_eq!(stats.current, Some(300.0));
        assert_eq!(stats.samples, 3);
    }

    #[test]
    fn test_window_evicts_oldest_first() {
        let mut tracker = LatencyTracker::default();
        for i in 0..51 {
            tracker.record(sample(i as f64));
        }

        assert_eq!(tracker.stats().samples, 50);
        let first = tracker.samples().next().expect("first sample");
        assert_eq!(first.rtt_ms, 1.0);
    }

    #[test]
    fn test_min_max_survive_eviction() {
        let mut tracker = LatencyTracker::new(2);
        tracker.record(sample(5.0));
        tracker.record(sample(500.0));
        tracker.record(sample(50.0));
        tracker.record(sample(60.0));

        let stats = tracker.stats();
        assert_eq!(stats.min, Some(5.0));
        assert_eq!(stats.max, Some(500.0));
        assert_eq!(stats.average, Some(55.0));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut tracker = LatencyTracker::new(0);
        tracker.record(sample(1.0));
        tracker.record(sample(2.0));
        assert_eq!(tracker.capacity(), 1);
        assert_eq!(tracker.stats().samples, 1);
    }
}

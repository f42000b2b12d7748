//! Text rendering of the status block.
//!
//! Produces plain lines tagged with a [`Tone`]; sinks decide how a tone looks.

use crate::format::{
    format_countdown, format_delta, format_duration, format_latency, group_thousands,
};
use crate::view::StatusView;

/// Visual emphasis of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Section heading.
    Heading,
    /// Healthy value.
    Good,
    /// Something the operator should notice.
    Warn,
    /// Failure or worst-case value.
    Bad,
    /// Neutral information.
    Info,
    /// Secondary information.
    Accent,
    /// Blank spacer.
    Plain,
}

/// One rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Text without styling.
    pub text: String,
    /// How the sink should emphasise the text.
    pub tone: Tone,
}

impl StatusLine {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    fn blank() -> Self {
        Self::new(Tone::Plain, "")
    }
}

/// Render the status block for `view`.
pub fn status_lines(view: &StatusView) -> Vec<StatusLine> {
    let (status_tone, status_text) = if view.state.is_connected() {
        (Tone::Good, "● CONNECTED".to_string())
    } else {
        (Tone::Bad, format!("○ {}", view.state))
    };

    let uptime_minutes = view.node_uptime.as_secs() / 60;
    let delta_tone = if view.points_delta > 0 {
        Tone::Warn
    } else {
        Tone::Good
    };

    let mut lines = vec![
        StatusLine::new(status_tone, format!("STATUS: {status_text}")),
        StatusLine::new(Tone::Warn, format!("Runtime: {}", format_duration(view.runtime))),
        StatusLine::new(
            Tone::Accent,
            format!("Node Uptime: {:02}:{:02}", uptime_minutes / 60, uptime_minutes % 60),
        ),
        StatusLine::new(
            Tone::Accent,
            format!(
                "Heartbeats Today: {}/{} ({:.1}%)",
                view.heartbeats_today, view.daily_cap, view.heartbeat_rate
            ),
        ),
        StatusLine::new(
            Tone::Info,
            format!("Heartbeats (local): {}", view.local_heartbeats),
        ),
        StatusLine::new(
            Tone::Info,
            format!("Next Heartbeat in: {}", format_countdown(view.next_heartbeat_in)),
        ),
        StatusLine::blank(),
        StatusLine::new(Tone::Heading, "Points Information"),
        StatusLine::new(
            Tone::Good,
            format!("Points Today (Node): {}", group_thousands(view.points_today)),
        ),
        StatusLine::new(
            delta_tone,
            format!(
                "Points Today (Dashboard): {} ({})",
                group_thousands(view.dashboard_points_today),
                format_delta(view.points_delta)
            ),
        ),
        StatusLine::new(
            Tone::Accent,
            format!("Heartbeats (Dashboard): {}", view.dashboard_heartbeats),
        ),
        StatusLine::new(
            Tone::Info,
            format!("Total Points: {}", group_thousands(view.points_total)),
        ),
        StatusLine::blank(),
        StatusLine::new(Tone::Heading, "Network Information"),
        StatusLine::new(Tone::Info, format!("Ping Count: {}", view.ping_count)),
        StatusLine::new(
            Tone::Good,
            format!("Current Latency: {}", format_latency(view.latency.current)),
        ),
        StatusLine::new(
            Tone::Info,
            format!("Average Latency: {}", format_latency(view.latency.average)),
        ),
        StatusLine::new(
            Tone::Info,
            format!("Min Latency: {}", format_latency(view.latency.min)),
        ),
        StatusLine::new(
            Tone::Bad,
            format!("Max Latency: {}", format_latency(view.latency.max)),
        ),
        StatusLine::new(
            Tone::Warn,
            format!("Connection Attempts: {}", view.connection_attempts),
        ),
    ];

    let last_pulse = match view.last_pulse_at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "N/A".to_string(),
    };
    lines.push(StatusLine::new(Tone::Accent, format!("Last Pulse: {last_pulse}")));

    lines
}

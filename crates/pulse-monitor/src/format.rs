//! Display formatting helpers.

use std::time::Duration;

/// `HH:MM:SS`; hours grow past two digits when needed.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// `MM:SS`, used for the heartbeat countdown.
pub fn format_countdown(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `12.3ms`, or `N/A` before the first sample.
pub fn format_latency(ms: Option<f64>) -> String {
    match ms {
        Some(ms) if ms.is_finite() => format!("{ms:.1}ms"),
        _ => "N/A".to_string(),
    }
}

/// `1234567` → `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed, grouped delta: `+1,500`, `0`, `-75`.
pub fn format_delta(delta: i64) -> String {
    let grouped = group_thousands(delta.unsigned_abs());
    match delta {
        d if d > 0 => format!("+{grouped}"),
        d if d < 0 => format!("-{grouped}"),
        _ => grouped,
    }
}

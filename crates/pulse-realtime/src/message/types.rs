//! Inbound and outbound frame definitions.

use serde::{Deserialize, Deserializer, Serialize};

use crate::metrics::PointTotals;

/// Substring identifying the peer's session confirmation.
pub const CONNECTED_MARKER: &str = "Connected successfully";

/// Substring identifying the peer's periodic status frame.
pub const PULSE_MARKER: &str = "Pulse from server";

/// Frames sent by the node to the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundFrame {
    /// Liveness and latency probe: `{"type":"PING"}`.
    Ping,
}

/// Raw shape of every frame the scoring service sends.
///
/// All fields are optional; classification happens in [`InboundFrame::classify`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundFrame {
    /// Frame type, e.g. `"PONG"`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Free-text status message. Not always a string.
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    /// Lifetime points.
    #[serde(rename = "pointsTotal", default, deserialize_with = "lenient_points")]
    pub points_total: Option<u64>,
    /// Today's points.
    #[serde(rename = "pointsToday", default, deserialize_with = "lenient_points")]
    pub points_today: Option<u64>,
}

/// Accept any JSON number as a point count.
///
/// Fractions are floored; negative values read as zero.
fn lenient_points<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(number.map(|n| points_from_number(&n)))
}

fn points_from_number(n: &serde_json::Number) -> u64 {
    if let Some(v) = n.as_u64() {
        return v;
    }
    if n.is_i64() {
        return 0;
    }
    match n.as_f64() {
        // `as` saturates at u64::MAX.
        Some(f) if f.is_finite() && f > 0.0 => f.floor() as u64,
        _ => 0,
    }
}

/// What an inbound frame means to the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Reply to our `PING`.
    Pong,
    /// The peer accepted the session and reports current totals.
    Connected(PointTotals),
    /// Periodic status with updated totals.
    Pulse(PointTotals),
    /// Anything else; carries the frame type for logging.
    Other(String),
}

impl InboundFrame {
    /// Free-text message as a string; non-string values are rendered as JSON.
    pub fn message_text(&self) -> String {
        match &self.message {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Totals carried by the frame; missing values read as zero.
    pub fn totals(&self) -> PointTotals {
        PointTotals {
            points_total: self.points_total.unwrap_or(0),
            points_today: self.points_today.unwrap_or(0),
        }
    }

    /// Classify the frame. `type` wins over `message`.
    pub fn classify(&self) -> InboundEvent {
        let kind = self.kind.as_deref().unwrap_or("");
        if kind == "PONG" {
            return InboundEvent::Pong;
        }

        let text = self.message_text();
        if text.contains(CONNECTED_MARKER) {
            InboundEvent::Connected(self.totals())
        } else if text.contains(PULSE_MARKER) {
            InboundEvent::Pulse(self.totals())
        } else {
            InboundEvent::Other(kind.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> InboundFrame {
        serde_json::from_str(raw).expect("valid frame")
    }

    #[test]
    fn test_ping_wire_format() {
        let json = serde_json::to_string(&OutboundFrame::Ping).expect("serialize");
        assert_eq!(json, r#"{"type":"PING"}"#);
    }

    #[test]
    fn test_classify_pong() {
        assert_eq!(parse(r#"{"type":"PONG"}"#).classify(), InboundEvent::Pong);
    }

    #[test]
    fn test_classify_connected() {
        let frame = parse(
            r#"{"message":"Connected successfully","pointsTotal":1200,"pointsToday":150}"#,
        );
        assert_eq!(
            frame.classify(),
            InboundEvent::Connected(PointTotals {
                points_total: 1200,
                points_today: 150,
            })
        );
    }

    #[test]
    fn test_classify_pulse_substring() {
        let frame = parse(r#"{"type":"STATUS","message":"[info] Pulse from server ok","pointsToday":75}"#);
        assert_eq!(
            frame.classify(),
            InboundEvent::Pulse(PointTotals {
                points_total: 0,
                points_today: 75,
            })
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(
            parse(r#"{"type":"NOTICE","message":"maintenance"}"#).classify(),
            InboundEvent::Other("NOTICE".to_string())
        );
        assert_eq!(parse("{}").classify(), InboundEvent::Other(String::new()));
    }

    #[test]
    fn test_points_accept_any_number() {
        let frame = parse(r#"{"pointsTotal":12345.9,"pointsToday":-3}"#);
        assert_eq!(
            frame.totals(),
            PointTotals {
                points_total: 12_345,
                points_today: 0,
            }
        );
        let frame = parse(r#"{"pointsTotal":1e30,"pointsToday":null}"#);
        assert_eq!(frame.totals().points_total, u64::MAX);
        assert_eq!(frame.totals().points_today, 0);
    }

    #[test]
    fn test_non_numeric_points_rejected() {
        assert!(serde_json::from_str::<InboundFrame>(r#"{"pointsToday":"150"}"#).is_err());
    }

    #[test]
    fn test_non_string_message_is_stringified() {
        let frame = parse(r#"{"message":{"detail":"Pulse from server"}}"#);
        assert!(matches!(frame.classify(), InboundEvent::Pulse(_)));
    }
}

//! Connection lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the manager is in the lifecycle of its single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No usable session; the supervisor will start one.
    #[default]
    Disconnected,
    /// A session was created and its handshake is in flight.
    Connecting,
    /// The transport reported readiness; the ping loop is running.
    Connected,
}

impl ConnectionState {
    /// Whether the session is open.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Connected => write!(f, "CONNECTED"),
        }
    }
}

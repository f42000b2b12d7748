//! Transport capability used by the connection manager.
//!
//! A [`Transport`] opens one session and hands back a [`FrameSink`] for
//! outbound frames plus a receiver of [`TransportEvent`]s standing in for the
//! open / message / error / close callbacks.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use pulse_core::AppConfig;
use pulse_core::AppResult;
use pulse_core::profile::BROWSER_HEADERS;

/// Something the transport observed on an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The session is ready for traffic.
    Open,
    /// A text frame from the peer.
    Message(String),
    /// A socket-level failure. Usually followed by the end of the stream.
    Error(String),
    /// The session is closed; no further events follow.
    Closed {
        /// Close code sent by the peer, if any.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

/// Outbound half of an open session.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Send one text frame.
    async fn send_text(&self, text: String) -> AppResult<()>;

    /// Start a close handshake.
    async fn close(&self) -> AppResult<()>;
}

/// An opened session: the sink plus its event stream.
pub struct SessionChannel {
    /// Outbound frames.
    pub sink: Arc<dyn FrameSink>,
    /// Inbound events, in order.
    pub events: mpsc::Receiver<TransportEvent>,
}

impl fmt::Debug for SessionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionChannel").finish_non_exhaustive()
    }
}

/// Opens sessions to the scoring service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the handshake for `request`.
    ///
    /// The first event on the returned channel is [`TransportEvent::Open`]
    /// once the session is usable.
    async fn open(&self, request: &SessionRequest) -> AppResult<SessionChannel>;
}

/// Target and headers of the session handshake.
#[derive(Clone)]
pub struct SessionRequest {
    /// Full URL including the `accessToken` and `version` query.
    pub url: String,
    /// Handshake headers.
    pub headers: Vec<(String, String)>,
}

impl SessionRequest {
    /// Build the request from configuration and the browser header profile.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            url: config.session_url(),
            headers: BROWSER_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// The URL without its query, safe to log.
    pub fn endpoint(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("endpoint", &self.endpoint())
            .field("headers", &self.headers.len())
            .finish()
    }
}

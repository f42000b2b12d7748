//! tokio-tungstenite implementation of [`Transport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use pulse_core::error::{AppError, ErrorKind};
use pulse_core::AppResult;

use super::transport::{FrameSink, SessionChannel, SessionRequest, Transport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Buffered events per session before the reader applies backpressure.
const EVENT_BUFFER: usize = 256;

/// WebSocket transport over TCP/TLS.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    /// Creates a transport whose handshake gives up after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, request: &SessionRequest) -> AppResult<SessionChannel> {
        let mut ws_request = request.url.as_str().into_client_request().map_err(|e| {
            AppError::with_source(ErrorKind::Transport, format!("Invalid session URL: {e}"), e)
        })?;

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                AppError::with_source(ErrorKind::Transport, format!("Invalid header name: {e}"), e)
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                AppError::with_source(ErrorKind::Transport, format!("Invalid header value: {e}"), e)
            })?;
            ws_request.headers_mut().insert(name, value);
        }

        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(ws_request))
            .await
            .map_err(|_| AppError::transport("WebSocket handshake timed out"))?
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transport,
                    format!("WebSocket handshake failed: {e}"),
                    e,
                )
            })?;

        debug!(
            endpoint = %request.endpoint(),
            status = %response.status(),
            "WebSocket handshake complete"
        );

        let (writer, reader) = stream.split();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        // Fresh channel: the first send cannot fail for lack of capacity.
        let _ = tx.try_send(TransportEvent::Open);
        let pump = tokio::spawn(pump_frames(reader, tx));

        Ok(SessionChannel {
            sink: Arc::new(WsSink {
                writer: Mutex::new(writer),
                pump,
            }),
            events: rx,
        })
    }
}

/// Forward socket frames as [`TransportEvent`]s until the stream ends.
async fn pump_frames(mut reader: SplitStream<WsStream>, events: mpsc::Sender<TransportEvent>) {
    while let Some(frame) = reader.next().await {
        let event = match frame {
            Ok(Message::Text(text)) => TransportEvent::Message(text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => TransportEvent::Message(text),
                Err(_) => {
                    debug!("Non-UTF-8 binary frame ignored");
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                let (code, reason) = match frame {
                    Some(f) => (Some(u16::from(f.code)), f.reason.as_str().to_owned()),
                    None => (None, String::new()),
                };
                let _ = events.send(TransportEvent::Closed { code, reason }).await;
                return;
            }
            // Control frames; tungstenite answers pings on its own.
            Ok(_) => continue,
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break,
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                return;
            }
        };

        if events.send(event).await.is_err() {
            return;
        }
    }

    let _ = events
        .send(TransportEvent::Closed {
            code: None,
            reason: "stream ended".to_string(),
        })
        .await;
}

/// Write half of a tungstenite session.
struct WsSink {
    writer: Mutex<SplitSink<WsStream, Message>>,
    pump: JoinHandle<()>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&self, text: String) -> AppResult<()> {
        let mut writer = self.writer.lock().await;
        writer.send(Message::Text(text.into())).await.map_err(|e| {
            AppError::with_source(ErrorKind::Transport, format!("WebSocket send failed: {e}"), e)
        })
    }

    async fn close(&self) -> AppResult<()> {
        let mut writer = self.writer.lock().await;
        writer.close().await.map_err(|e| {
            AppError::with_source(ErrorKind::Transport, format!("WebSocket close failed: {e}"), e)
        })
    }
}

impl Drop for WsSink {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

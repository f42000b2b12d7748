//! In-memory transport for exercising the manager without a network.
//!
//! Every successful [`MockTransport::open`] yields a [`MockPeer`] that plays
//! the remote side: it emits transport events and observes what the client
//! sent.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use pulse_core::{AppError, AppResult};

use super::transport::{FrameSink, SessionChannel, SessionRequest, Transport, TransportEvent};

const EVENT_BUFFER: usize = 64;

/// Fake transport handing out one [`MockPeer`] per opened session.
#[derive(Debug)]
pub struct MockTransport {
    peers: mpsc::UnboundedSender<MockPeer>,
    refuse: AtomicBool,
    opens: AtomicUsize,
    last_request: Mutex<Option<SessionRequest>>,
}

impl MockTransport {
    /// Create the transport and the receiver its peers are delivered on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                peers: tx,
                refuse: AtomicBool::new(false),
                opens: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            },
            rx,
        )
    }

    /// Make subsequent opens fail with a transport error.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Number of `open` calls, refused ones included.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// The request passed to the most recent `open`.
    pub fn last_request(&self) -> Option<SessionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, request: &SessionRequest) -> AppResult<SessionChannel> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if self.refuse.load(Ordering::SeqCst) {
            return Err(AppError::transport("Connection refused"));
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(PeerShared {
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
        });

        let sink = MockSink {
            sent: sent_tx,
            events: events_tx.clone(),
            shared: shared.clone(),
        };
        let peer = MockPeer {
            events: events_tx,
            sent: sent_rx,
            shared,
        };

        if self.peers.send(peer).is_err() {
            return Err(AppError::transport("Mock peer receiver dropped"));
        }

        Ok(SessionChannel {
            sink: Arc::new(sink),
            events: events_rx,
        })
    }
}

#[derive(Debug)]
struct PeerShared {
    closed: AtomicBool,
    fail_sends: AtomicBool,
}

/// Remote end of a mock session.
#[derive(Debug)]
pub struct MockPeer {
    events: mpsc::Sender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<String>,
    shared: Arc<PeerShared>,
}

impl MockPeer {
    async fn emit(&self, event: TransportEvent) {
        // The driver may already be gone; the event is then moot.
        let _ = self.events.send(event).await;
    }

    /// Report the session ready.
    pub async fn open(&self) {
        self.emit(TransportEvent::Open).await;
    }

    /// Deliver a text frame to the client.
    pub async fn deliver(&self, raw: impl Into<String>) {
        self.emit(TransportEvent::Message(raw.into())).await;
    }

    /// Report a socket error.
    pub async fn error(&self, message: impl Into<String>) {
        self.emit(TransportEvent::Error(message.into())).await;
    }

    /// Close from the remote side.
    pub async fn close(&self, code: u16, reason: impl Into<String>) {
        self.emit(TransportEvent::Closed {
            code: Some(code),
            reason: reason.into(),
        })
        .await;
    }

    /// Make every later client send fail.
    pub fn fail_sends(&self) {
        self.shared.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Whether the client closed this session.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Next frame the client sent, waiting for one if necessary.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Next frame the client sent, if one is already queued.
    pub fn try_next_sent(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }
}

struct MockSink {
    sent: mpsc::UnboundedSender<String>,
    events: mpsc::Sender<TransportEvent>,
    shared: Arc<PeerShared>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send_text(&self, text: String) -> AppResult<()> {
        if self.shared.fail_sends.load(Ordering::SeqCst) || self.shared.closed.load(Ordering::SeqCst)
        {
            return Err(AppError::transport("Mock send failed"));
        }
        self.sent
            .send(text)
            .map_err(|_| AppError::transport("Mock peer dropped"))
    }

    async fn close(&self) -> AppResult<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self
            .events
            .try_send(TransportEvent::Closed {
                code: Some(1000),
                reason: "client close".to_string(),
            });
        Ok(())
    }
}

//! One transport session and the tasks that serve it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use pulse_core::{AppError, AppResult};

use crate::message::types::OutboundFrame;

use super::transport::FrameSink;

/// Unique session identifier
pub type SessionId = Uuid;

/// A single session with the scoring service.
///
/// Sessions are never reused: a reconnect retires the current one and builds
/// a new one with the next attempt number.
pub struct Session {
    /// Unique session ID
    pub id: SessionId,
    /// Connection attempt that created this session
    pub attempt: u64,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    connected: AtomicBool,
    sink: OnceLock<Arc<dyn FrameSink>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Create a session for connection attempt `attempt`.
    pub fn new(attempt: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt,
            created_at: Utc::now(),
            connected: AtomicBool::new(false),
            sink: OnceLock::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Attach the outbound sink once the transport has opened.
    pub fn attach(&self, sink: Arc<dyn FrameSink>) {
        if self.sink.set(sink).is_err() {
            tracing::warn!("Session {} already has a sink", self.id);
        }
    }

    /// Whether the session is open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Mark the session open.
    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Mark the session down. Its ping loop exits on its next iteration.
    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Serialize and send one frame.
    pub async fn send(&self, frame: &OutboundFrame) -> AppResult<()> {
        let sink = self
            .sink
            .get()
            .ok_or_else(|| AppError::transport(format!("Session {} is not open", self.id)))?;
        let text = serde_json::to_string(frame)?;
        sink.send_text(text).await
    }

    /// Mark the session down and start the close handshake.
    pub async fn close(&self) -> AppResult<()> {
        self.mark_disconnected();
        match self.sink.get() {
            Some(sink) => sink.close().await,
            None => Ok(()),
        }
    }

    /// Register a task that must end with the session.
    pub fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    /// Number of tracked tasks still running.
    pub fn running_tasks(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait up to `grace` for every tracked task, then abort the rest.
    ///
    /// Returns the number of tasks that had to be aborted.
    pub async fn join(&self, grace: Duration) -> usize {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain(..).collect()
        };

        let deadline = Instant::now() + grace;
        let mut abandoned = 0;
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                abandoned += 1;
            }
        }

        if abandoned > 0 {
            tracing::debug!("Session {}: abandoned {} task(s)", self.id, abandoned);
        }
        abandoned
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("attempt", &self.attempt)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_before_open_fails() {
        let session = Session::new(1);
        let err = session.send(&OutboundFrame::Ping).await.unwrap_err();
        assert_eq!(err.kind, pulse_core::error::ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_close_without_sink_is_ok() {
        let session = Session::new(1);
        session.mark_connected();
        session.close().await.expect("close");
        assert!(!session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_aborts_hung_tasks() {
        let session = Session::new(1);
        session.track(tokio::spawn(async {}));
        session.track(tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }));

        let abandoned = session.join(Duration::from_secs(1)).await;
        assert_eq!(abandoned, 1);
        assert_eq!(session.running_tasks(), 0);
    }
}

//! # pulse-realtime
//!
//! Live side of the pulse node. Provides:
//!
//! - A single-session WebSocket connection manager with a fixed-delay
//!   reconnect supervisor
//! - The outbound `PING` heartbeat loop
//! - Inbound frame decoding and the updates it drives
//! - The shared metrics store (points, heartbeats, latency window, clocks)
//!   read by the presenter
//! - A transport abstraction with a tungstenite implementation and an
//!   in-memory mock for tests

pub mod connection;
pub mod message;
pub mod metrics;

pub use connection::manager::ConnectionManager;
pub use connection::state::ConnectionState;
pub use connection::transport::SessionRequest;
pub use connection::websocket::WsTransport;
pub use message::handler::MessageHandler;
pub use metrics::store::{MetricsSnapshot, MetricsStore};

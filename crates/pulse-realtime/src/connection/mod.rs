//! Session lifecycle: transport abstraction, session handle, ping loop and
//! the reconnecting manager.

pub mod heartbeat;
pub mod manager;
pub mod mock;
pub mod session;
pub mod state;
pub mod transport;
pub mod websocket;

pub use manager::ConnectionManager;
pub use session::{Session, SessionId};
pub use state::ConnectionState;
pub use transport::{FrameSink, SessionChannel, SessionRequest, Transport, TransportEvent};
pub use websocket::WsTransport;

//! Frame types and the inbound message handler.

pub mod handler;
pub mod types;

pub use handler::MessageHandler;
pub use types::{InboundEvent, InboundFrame, OutboundFrame};

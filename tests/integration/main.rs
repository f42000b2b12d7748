//! End-to-end tests: real tungstenite transport, connection manager,
//! supervisor and presenter against a local service.

mod helpers;
mod node_test;

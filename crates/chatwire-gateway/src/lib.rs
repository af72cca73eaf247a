//! Chatwire WebSocket gateway.
//!
//! Bridges the chat-automation engine to WebSocket subscribers: engine
//! events are normalized, persisted, and fanned out to every connection;
//! client commands are dispatched against the engine and answered on the
//! issuing connection only.

pub mod calls;
pub mod commands;
pub mod connection;
pub mod events;
pub mod relay;
pub mod server;
pub mod state;

pub use server::start_gateway;
pub use state::GatewayState;

//! Realtime core components for the relay runtime.
//!
//! The connection registry (who is online) and the broadcaster that fans a
//! payload out to everyone but its sender.

mod broadcast;
mod connection_registry;

pub use broadcast::Broadcaster;
pub use connection_registry::ConnectionRegistry;

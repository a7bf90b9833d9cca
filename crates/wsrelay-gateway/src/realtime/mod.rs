//! Realtime runtime (egress engine) for the relay.
//!
//! Connection registry + broadcast dispatch with lossy/reliable delivery.

pub mod core;
pub mod types;

pub use self::core::{Broadcaster, ConnectionRegistry};
pub use types::{BroadcastReport, Connection, Delivery};

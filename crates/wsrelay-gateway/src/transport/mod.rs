//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the codec that maps frames to relay
//! payloads and back.

pub mod codec;
pub mod ws;

//! Frame codec for the transport layer.
//!
//! - Text/Binary frames => opaque `Payload` (no parsing, no copy of binary data
//!   beyond what axum hands us)
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use bytes::Bytes;
use wsrelay_core::Payload;

#[derive(Debug)]
pub enum Inbound {
    Data(Payload),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

pub fn decode(msg: Message) -> Inbound {
    match msg {
        Message::Text(s) => Inbound::Data(Payload::Text(s)),
        Message::Binary(b) => Inbound::Data(Payload::Binary(Bytes::from(b))),
        Message::Ping(v) => Inbound::Ping(v),
        Message::Pong(v) => Inbound::Pong(v),
        Message::Close(_) => Inbound::Close,
    }
}

/// Convert to axum::ws::Message for transport.
/// NOTE: axum::Message::Binary requires Vec<u8>, so the Binary path copies once per recipient.
pub fn encode(payload: Payload) -> Message {
    match payload {
        Payload::Text(s) => Message::Text(s),
        Payload::Binary(b) => Message::Binary(b.to_vec()),
    }
}

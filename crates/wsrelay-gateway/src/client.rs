//! Relay client over tokio-tungstenite.
//!
//! Used by the `wsrelay-client` terminal binary and by end-to-end tests.
//! Control frames are handled by tungstenite (pings are answered on the next
//! read/write) and never surface as payloads.

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use wsrelay_core::error::{RelayError, Result};
use wsrelay_core::Payload;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default relay endpoint.
pub const DEFAULT_URL: &str = "ws://localhost:5001/";

fn transport_err(e: tokio_tungstenite::tungstenite::Error) -> RelayError {
    RelayError::Transport(e.to_string())
}

/// Connected relay client (both halves).
pub struct RelayClient {
    sender: RelaySender,
    receiver: RelayReceiver,
}

impl RelayClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _resp) = connect_async(url).await.map_err(transport_err)?;
        let (sink, stream) = stream.split();
        Ok(Self {
            sender: RelaySender { sink },
            receiver: RelayReceiver { stream },
        })
    }

    pub async fn send(&mut self, payload: impl Into<Payload>) -> Result<()> {
        self.sender.send(payload).await
    }

    pub async fn recv(&mut self) -> Result<Option<Payload>> {
        self.receiver.recv().await
    }

    pub async fn close(self) -> Result<()> {
        self.sender.close().await
    }

    /// Split into independently usable halves (e.g. for a select loop).
    pub fn into_split(self) -> (RelaySender, RelayReceiver) {
        (self.sender, self.receiver)
    }
}

pub struct RelaySender {
    sink: SplitSink<WsStream, Message>,
}

impl RelaySender {
    pub async fn send(&mut self, payload: impl Into<Payload>) -> Result<()> {
        let msg = match payload.into() {
            Payload::Text(s) => Message::Text(s),
            Payload::Binary(b) => Message::Binary(b.to_vec()),
        };
        self.sink.send(msg).await.map_err(transport_err)
    }

    /// Send a close frame and flush.
    pub async fn close(mut self) -> Result<()> {
        self.sink.close().await.map_err(transport_err)
    }
}

pub struct RelayReceiver {
    stream: SplitStream<WsStream>,
}

impl RelayReceiver {
    /// Next relayed payload. `None` once the server closed the session.
    pub async fn recv(&mut self) -> Result<Option<Payload>> {
        while let Some(msg) = self.stream.next().await {
            match msg.map_err(transport_err)? {
                Message::Text(s) => return Ok(Some(Payload::Text(s))),
                Message::Binary(b) => return Ok(Some(Payload::Binary(Bytes::from(b)))),
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Ok(None)
    }
}

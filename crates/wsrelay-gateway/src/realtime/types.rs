use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;

use wsrelay_core::{ConnId, Payload, SendFailureReason};

use crate::config::{DeliveryConfig, DeliveryMode};

/// Send capability for one connected client.
///
/// Wraps the sending half of the session's bounded outbound queue; the
/// session task owns the receiver and writes to the socket. Cloning is cheap
/// and every clone refers to the same session.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnId,
    tx: mpsc::Sender<Payload>,
}

impl Connection {
    pub fn new(id: ConnId, tx: mpsc::Sender<Payload>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Non-blocking enqueue.
    pub fn try_send(&self, payload: Payload) -> Result<(), SendFailureReason> {
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => SendFailureReason::QueueFull,
            TrySendError::Closed(_) => SendFailureReason::Closed,
        })
    }

    /// Awaited enqueue bounded by `limit`.
    pub async fn send_within(&self, payload: Payload, limit: Duration) -> Result<(), SendFailureReason> {
        match timeout(limit, self.tx.send(payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SendFailureReason::Closed),
            Err(_) => Err(SendFailureReason::Timeout),
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

/// Delivery strategy resolved from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Latency-critical: do not await; if a recipient's queue is full, drop for it.
    Lossy,
    /// Attempt every recipient concurrently, each bounded by `send_timeout`.
    Reliable { send_timeout: Duration },
}

impl From<&DeliveryConfig> for Delivery {
    fn from(cfg: &DeliveryConfig) -> Self {
        match cfg.mode {
            DeliveryMode::Lossy => Delivery::Lossy,
            DeliveryMode::Reliable => Delivery::Reliable {
                send_timeout: cfg.send_timeout(),
            },
        }
    }
}

impl Delivery {
    pub fn as_str(self) -> &'static str {
        match self {
            Delivery::Lossy => "lossy",
            Delivery::Reliable { .. } => "reliable",
        }
    }
}

/// Outcome of one broadcast, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients attempted (snapshot size minus the sender).
    pub attempted: usize,
    /// Sends that reached the recipient's queue.
    pub delivered: usize,
    /// Recipients whose send failed, and why.
    pub failed: Vec<(ConnId, SendFailureReason)>,
}

impl BroadcastReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

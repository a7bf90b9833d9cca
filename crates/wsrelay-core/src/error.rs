//! Shared error type across wsRelay crates.
//!
//! None of these errors are ever written back to a remote client; they exist
//! for internal bookkeeping, logs, and metric labels.

use std::fmt;

use thiserror::Error;

use crate::conn::ConnId;

/// Stable error categories (log field / metric label values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect reported twice for one identity.
    DuplicateConnect,
    /// Disconnect for an identity that is not registered.
    UnknownDisconnect,
    /// One recipient could not be sent to.
    SendFailure,
    /// Socket bind/accept/read/write failure.
    Transport,
    /// Invalid configuration.
    Config,
    /// Unsupported configuration version.
    UnsupportedVersion,
}

impl ErrorKind {
    /// String representation used in log fields and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DuplicateConnect => "DUPLICATE_CONNECT",
            ErrorKind::UnknownDisconnect => "UNKNOWN_DISCONNECT",
            ErrorKind::SendFailure => "SEND_FAILURE",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Config => "CONFIG",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
        }
    }
}

/// Why a single send attempt did not reach the recipient's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailureReason {
    /// Outbound queue at capacity (lossy delivery).
    QueueFull,
    /// Receiver side already gone (session closing).
    Closed,
    /// Per-send deadline elapsed (reliable delivery).
    Timeout,
}

impl SendFailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SendFailureReason::QueueFull => "queue_full",
            SendFailureReason::Closed => "closed",
            SendFailureReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for SendFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("duplicate connect for {0}")]
    DuplicateConnect(ConnId),
    #[error("disconnect for unknown connection {0}")]
    UnknownDisconnect(ConnId),
    #[error("send to {conn} failed: {reason}")]
    SendFailure {
        conn: ConnId,
        reason: SendFailureReason,
    },
    #[error("transport: {0}")]
    Transport(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
}

impl RelayError {
    /// Map an error to its stable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::DuplicateConnect(_) => ErrorKind::DuplicateConnect,
            RelayError::UnknownDisconnect(_) => ErrorKind::UnknownDisconnect,
            RelayError::SendFailure { .. } => ErrorKind::SendFailure,
            RelayError::Transport(_) => ErrorKind::Transport,
            RelayError::Config(_) => ErrorKind::Config,
            RelayError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

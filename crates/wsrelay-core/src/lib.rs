//! wsRelay core: transport-agnostic relay primitives and the shared error type.
//!
//! This crate defines what the gateway moves around (opaque payloads) and how
//! connections are identified, plus the error surface shared by every layer.
//! It intentionally carries no transport or runtime dependencies so the
//! registry and dispatcher contracts can be exercised without a socket.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `RelayError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod conn;
pub mod error;
pub mod payload;

pub use conn::ConnId;
/// Shared result type.
pub use error::{ErrorKind, RelayError, Result, SendFailureReason};
pub use payload::Payload;

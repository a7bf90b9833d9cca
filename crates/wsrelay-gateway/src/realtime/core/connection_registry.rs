use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use wsrelay_core::error::{RelayError, Result};
use wsrelay_core::ConnId;

use crate::realtime::types::Connection;

/// Authoritative set of open connections, keyed by identity.
///
/// Backed by a sharded map: `add`/`remove` lock one shard for the duration of
/// the map operation only, and `snapshot` clones handles out so callers never
/// hold a shard lock while sending.
#[derive(Debug)]
pub struct ConnectionRegistry {
    conns: DashMap<ConnId, Connection>,
    seq: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            conns: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Issue a fresh identity for a new session.
    pub fn next_id(&self) -> ConnId {
        ConnId::new(self.seq.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a connection. A second connect for a live identity keeps the
    /// existing entry and reports `DuplicateConnect`.
    pub fn add(&self, conn: Connection) -> Result<()> {
        match self.conns.entry(conn.id()) {
            Entry::Occupied(e) => Err(RelayError::DuplicateConnect(*e.key())),
            Entry::Vacant(e) => {
                e.insert(conn);
                Ok(())
            }
        }
    }

    /// Remove by identity. Unknown ids are a no-op and return `None`.
    pub fn remove(&self, id: ConnId) -> Option<Connection> {
        self.conns.remove(&id).map(|(_, conn)| conn)
    }

    /// Owned copy of current membership, safe to iterate while others mutate.
    pub fn snapshot(&self) -> Vec<Connection> {
        self.conns.iter().map(|r| r.value().clone()).collect()
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.conns.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}

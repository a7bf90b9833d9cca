//! Shared application state for the relay gateway.
//!
//! Owns the single process-scoped connection registry and hands it to the
//! broadcaster; nothing here is a global, so tests build their own instance.
//! Connect/disconnect bookkeeping and the shutdown fan-out live here so the
//! transport only drives events.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, Duration, Instant};

use wsrelay_core::error::{RelayError, Result};
use wsrelay_core::ConnId;

use crate::config::GatewayConfig;
use crate::obs::RelayMetrics;
use crate::realtime::{Broadcaster, Connection, ConnectionRegistry, Delivery};

const DRAIN_POLL: Duration = Duration::from_millis(20);

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<GatewayConfig>,
    registry: Arc<ConnectionRegistry>,
    broadcaster: Arc<Broadcaster>,
    metrics: Arc<RelayMetrics>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Build application state from a config (validated again here so
    /// hand-built configs get the same checks as loaded ones).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        cfg.validate()?;

        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(RelayMetrics::default());
        let delivery = Delivery::from(&cfg.delivery);
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::clone(&registry),
            delivery,
            Arc::clone(&metrics),
        ));
        let (shutdown, _) = watch::channel(false);

        tracing::debug!(delivery = delivery.as_str(), "relay state ready");

        Ok(Self {
            cfg: Arc::new(cfg),
            registry,
            broadcaster,
            metrics,
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.cfg
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        Arc::clone(&self.broadcaster)
    }

    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Connect event: register `conn`. A duplicate identity is counted and
    /// returned; the registry keeps the existing entry.
    pub fn connect(&self, conn: Connection) -> Result<()> {
        if let Err(e) = self.registry.add(conn) {
            self.metrics.duplicate_connects.inc(&[]);
            tracing::warn!(error = %e, kind = e.kind().as_str(), "connect ignored");
            return Err(e);
        }
        self.metrics.connections_accepted.inc(&[]);
        self.metrics.connections_active.inc(&[]);
        tracing::info!(online = self.registry.len(), "client connected");
        Ok(())
    }

    /// Disconnect event: unregister `id`. Unknown ids are a counted no-op.
    pub fn disconnect(&self, id: ConnId) -> Option<Connection> {
        let Some(conn) = self.registry.remove(id) else {
            let e = RelayError::UnknownDisconnect(id);
            self.metrics.unknown_disconnects.inc(&[]);
            tracing::debug!(error = %e, kind = e.kind().as_str(), "disconnect ignored");
            return None;
        };
        self.metrics.connections_active.dec(&[]);
        tracing::info!(online = self.registry.len(), "client disconnected");
        Some(conn)
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    /// Mark the relay as draining so `/readyz` starts failing.
    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }

    /// Start shutdown: mark draining and tell every session to close.
    pub fn begin_shutdown(&self) {
        self.set_draining();
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that changes once `begin_shutdown` runs.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Wait (bounded by `gateway.drain_timeout_ms`) for every session to
    /// unregister. Returns false if some were still open at the deadline.
    pub async fn wait_drained(&self) -> bool {
        let deadline = Instant::now() + self.cfg.gateway.drain_timeout();
        let mut poll = interval(DRAIN_POLL);
        loop {
            if self.registry.is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                tracing::warn!(remaining = self.registry.len(), "drain timeout with sessions still open");
                return false;
            }
            poll.tick().await;
        }
    }

    /// Point-in-time values rendered next to the registered metrics.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![("wsrelay_registry_size", self.registry.len() as u64)]
    }
}

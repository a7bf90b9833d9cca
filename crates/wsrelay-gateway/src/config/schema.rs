use std::time::Duration;

use serde::Deserialize;
use wsrelay_core::error::{RelayError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.delivery.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Per-connection outbound queue capacity (messages).
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    /// Upper bound on one socket write; a peer that stops reading is dropped.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// How long shutdown waits for sessions to close.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ws_path: default_ws_path(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
            write_timeout_ms: default_write_timeout_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !self.ws_path.starts_with('/') {
            return Err(RelayError::Config("gateway.ws_path must start with '/'".into()));
        }
        if matches!(self.ws_path.as_str(), "/healthz" | "/readyz" | "/metrics") {
            return Err(RelayError::Config(
                "gateway.ws_path collides with an ops endpoint".into(),
            ));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(RelayError::Config(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(RelayError::Config(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RelayError::Config(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(RelayError::Config("gateway.max_frame_bytes must be > 0".into()));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(RelayError::Config(
                "gateway.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if !(100..=60000).contains(&self.write_timeout_ms) {
            return Err(RelayError::Config(
                "gateway.write_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.drain_timeout_ms > 60000 {
            return Err(RelayError::Config(
                "gateway.drain_timeout_ms must be at most 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:5001".into()
}
fn default_ws_path() -> String {
    "/".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    64 * 1024
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_write_timeout_ms() -> u64 {
    10000
}
fn default_drain_timeout_ms() -> u64 {
    5000
}

/// How the dispatcher hands a payload to each recipient's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// try_send only; drop for that recipient if its queue is full.
    #[default]
    Lossy,
    /// Concurrent awaited sends, each bounded by `send_timeout_ms`.
    Reliable,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub mode: DeliveryMode,

    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl DeliveryConfig {
    pub fn validate(&self) -> Result<()> {
        // An unbounded awaited send lets two full queues wait on each other forever.
        if self.mode == DeliveryMode::Reliable && !(1..=60000).contains(&self.send_timeout_ms) {
            return Err(RelayError::Config(
                "delivery.send_timeout_ms must be between 1 and 60000 in reliable mode".into(),
            ));
        }
        Ok(())
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

fn default_send_timeout_ms() -> u64 {
    1500
}

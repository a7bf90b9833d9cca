//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io;
use std::path::Path;

use wsrelay_core::error::{RelayError, Result};

pub use schema::{DeliveryConfig, DeliveryMode, GatewayConfig, GatewaySection};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WSRELAY_CONFIG";
/// Config file used when `WSRELAY_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "wsrelay.yaml";

pub fn load_from_file(path: impl AsRef<Path>) -> Result<GatewayConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| RelayError::Config(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| RelayError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load the file named by `WSRELAY_CONFIG` (or `wsrelay.yaml`).
/// A missing file falls back to built-in defaults; a present but invalid one is an error.
pub fn load_from_env() -> Result<GatewayConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    match fs::read_to_string(&path) {
        Ok(s) => {
            tracing::info!(%path, "loading config");
            load_from_str(&s)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            let cfg = GatewayConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) => Err(RelayError::Config(format!("read {path} failed: {e}"))),
    }
}

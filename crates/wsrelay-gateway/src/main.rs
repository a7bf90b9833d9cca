//! wsRelay gateway
//!
//! - WebSocket endpoint: `gateway.ws_path` (default `/`)
//! - Every text/binary frame is relayed to all other connected clients
//! - Tracing span per session
//! - Heartbeat ping + idle timeout
//! - Graceful shutdown on Ctrl-C / SIGTERM

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsrelay_core::error::{RelayError, Result};
use wsrelay_gateway::{app_state::AppState, config};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind().as_str(), "wsrelay-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load_from_env()?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| RelayError::Config(format!("gateway.listen must be a valid SocketAddr: {e}")))?;

    let state = AppState::new(cfg)?;

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| RelayError::Transport(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, path = %state.cfg().gateway.ws_path, "wsrelay-gateway starting");

    wsrelay_gateway::serve(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}

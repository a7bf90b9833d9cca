//! wsRelay gateway library entry.
//!
//! This crate wires the transport, connection registry, broadcaster and ops
//! endpoints into a relay server: every frame one client sends is forwarded
//! to all other connected clients. It is consumed by the binaries and by
//! integration tests.

pub mod app_state;
pub mod client;
pub mod config;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod transport;

use std::future::Future;

use tokio::net::TcpListener;

use wsrelay_core::error::Result;

/// Serve `state` on an already-bound listener until `shutdown` resolves.
///
/// On shutdown the relay turns draining (the listener stays open, so
/// `/readyz` answers 503), every session is told to close, and the listener
/// is only released once the registry is empty or `drain_timeout_ms` passed.
pub async fn serve<F>(listener: TcpListener, state: app_state::AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router::build_router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            state.begin_shutdown();
            tracing::info!(online = state.registry().len(), "draining");
            if state.wait_drained().await {
                tracing::info!("all sessions closed");
            }
        })
        .await?;
    Ok(())
}

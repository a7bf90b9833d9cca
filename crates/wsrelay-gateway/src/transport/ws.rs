//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS (frame size capped by `gateway.max_frame_bytes`)
//! - Lifecycle: register on connect, unregister on disconnect
//! - Relay every text/binary frame to all other connections
//! - Heartbeat ping + idle timeout
//! - Close with 1001 when the relay shuts down
//!
//! One task per connection multiplexes the socket reader, the outbound queue
//! writer, the ping ticker, the idle deadline and the shutdown signal. Every
//! socket write is bounded by `gateway.write_timeout_ms` so a peer that stops
//! reading cannot freeze the loop.

use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep_until, timeout, Instant, MissedTickBehavior};
use tracing::Instrument;

use wsrelay_core::error::Result;
use wsrelay_core::{ConnId, Payload};

use crate::app_state::AppState;
use crate::obs::RelayMetrics;
use crate::realtime::Connection;
use crate::transport::codec::{decode, encode, Inbound};

type WsSink = SplitSink<WebSocket, Message>;

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max = app.cfg().gateway.max_frame_bytes;
    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| {
            let id = app.registry().next_id();
            let span = tracing::info_span!("session", conn = %id);
            async move {
                if let Err(e) = run_session(app, id, socket).await {
                    tracing::warn!(error = %e, kind = e.kind().as_str(), "session ended with error");
                }
            }
            .instrument(span)
        })
}

// --------------------
// Connect / disconnect
// --------------------
async fn run_session(app: AppState, id: ConnId, socket: WebSocket) -> Result<()> {
    let (out_tx, out_rx) = mpsc::channel::<Payload>(app.cfg().gateway.outbound_queue);
    app.connect(Connection::new(id, out_tx))?;

    session_loop(&app, id, socket, out_rx).await;

    app.disconnect(id);
    Ok(())
}

// --------------------
// Bounded socket write
// --------------------
/// Returns false when the session must end (peer gone or not reading).
async fn write_frame(ws_tx: &mut WsSink, msg: Message, limit: Duration, metrics: &RelayMetrics) -> bool {
    match timeout(limit, ws_tx.send(msg)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "write failed");
            false
        }
        Err(_) => {
            metrics.writer_timeouts.inc(&[]);
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "write timed out; peer is not reading");
            false
        }
    }
}

fn going_away() -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::AWAY,
        reason: "relay shutting down".into(),
    }))
}

// --------------------
// Core session loop
// --------------------
async fn session_loop(app: &AppState, id: ConnId, socket: WebSocket, mut out_rx: mpsc::Receiver<Payload>) {
    let broadcaster = app.broadcaster();
    let metrics = app.metrics();
    let gw = &app.cfg().gateway;

    let (mut ws_tx, mut ws_rx) = socket.split();
    let write_limit = gw.write_timeout();

    let mut shutdown = app.shutdown_signal();
    let already_shutting_down = *shutdown.borrow_and_update();
    if already_shutting_down {
        tracing::debug!("upgraded during shutdown; closing");
        let _ = write_frame(&mut ws_tx, going_away(), write_limit, &metrics).await;
        return;
    }

    let ping_every = gw.ping_interval();
    let idle_timeout = gw.idle_timeout();
    let mut ping_tick = interval_at(Instant::now() + ping_every, ping_every);
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(payload) = maybe_out else { break; };
                if !write_frame(&mut ws_tx, encode(payload), write_limit, &metrics).await {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break; };
                let msg = match incoming {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(error = %e, "read failed");
                        break;
                    }
                };

                last_activity = Instant::now();

                match decode(msg) {
                    Inbound::Data(payload) => {
                        metrics.messages_received.inc(&[("kind", payload.kind())]);
                        tracing::debug!(kind = payload.kind(), len = payload.len(), "received");

                        let report = broadcaster.broadcast(&payload, Some(id)).await;
                        tracing::trace!(attempted = report.attempted, delivered = report.delivered, "relayed");
                    }
                    Inbound::Ping(payload) => {
                        if !write_frame(&mut ws_tx, Message::Pong(payload), write_limit, &metrics).await {
                            break;
                        }
                    }
                    Inbound::Pong(_) => {}
                    Inbound::Close => break,
                }
            }

            // ping
            _ = ping_tick.tick() => {
                if !write_frame(&mut ws_tx, Message::Ping(Vec::new()), write_limit, &metrics).await {
                    break;
                }
            }

            // idle timeout
            _ = sleep_until(last_activity + idle_timeout) => {
                tracing::info!(idle_ms = idle_timeout.as_millis() as u64, "idle timeout");
                break;
            }

            // relay shutdown (a dropped sender counts as shutdown too)
            _ = shutdown.changed() => {
                tracing::debug!("relay shutting down; closing session");
                let _ = write_frame(&mut ws_tx, going_away(), write_limit, &metrics).await;
                break;
            }
        }
    }

    let _ = timeout(write_limit, ws_tx.close()).await;
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;

use wsrelay_core::{ConnId, Payload, SendFailureReason};

use crate::obs::{LogThrottle, RelayMetrics};
use crate::realtime::core::ConnectionRegistry;
use crate::realtime::types::{BroadcastReport, Connection, Delivery};

/// Fan-out engine: one payload to every registered connection but the sender.
///
/// Reads the registry through `snapshot()` only; it never adds or removes
/// entries. Dead connections are left to the disconnect path.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    delivery: Delivery,
    metrics: Arc<RelayMetrics>,
    failure_warn: LogThrottle,
}

const FAILURE_WARN_EVERY: Duration = Duration::from_secs(1);

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, delivery: Delivery, metrics: Arc<RelayMetrics>) -> Self {
        Self {
            registry,
            delivery,
            metrics,
            failure_warn: LogThrottle::new(FAILURE_WARN_EVERY),
        }
    }

    /// Deliver `payload` to all connections except `sender` (`None` = nobody excluded).
    pub async fn broadcast(&self, payload: &Payload, sender: Option<ConnId>) -> BroadcastReport {
        let started = Instant::now();
        let recipients = self.recipients(sender);

        let report = match self.delivery {
            Delivery::Lossy => fan_out_lossy(&recipients, payload),
            Delivery::Reliable { send_timeout } => {
                fan_out_reliable(recipients, payload, send_timeout).await
            }
        };

        self.record(&report, started.elapsed());
        report
    }

    fn recipients(&self, sender: Option<ConnId>) -> Vec<Connection> {
        let mut conns = self.registry.snapshot();
        if let Some(sender) = sender {
            conns.retain(|c| c.id() != sender);
        }
        conns
    }

    fn record(&self, report: &BroadcastReport, elapsed: Duration) {
        let mode = self.delivery.as_str();
        self.metrics.broadcasts.inc(&[("mode", mode)]);
        self.metrics.deliveries.add(&[("mode", mode)], report.delivered as u64);
        self.metrics.broadcast_duration.observe(&[("mode", mode)], elapsed);

        for (conn, reason) in &report.failed {
            self.metrics.send_failures.inc(&[("reason", reason.as_str())]);
            tracing::debug!(%conn, reason = reason.as_str(), "send failed; leaving cleanup to disconnect");
        }
        if report.is_clean() {
            return;
        }
        // a stuck recipient fails every broadcast; warn once per window
        match self.failure_warn.allow() {
            Some(suppressed) => tracing::warn!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed.len(),
                suppressed,
                "broadcast had failed recipients"
            ),
            None => tracing::debug!(
                attempted = report.attempted,
                failed = report.failed.len(),
                "broadcast had failed recipients"
            ),
        }
    }
}

fn fan_out_lossy(recipients: &[Connection], payload: &Payload) -> BroadcastReport {
    let mut report = BroadcastReport {
        attempted: recipients.len(),
        ..BroadcastReport::default()
    };
    for conn in recipients {
        match conn.try_send(payload.clone()) {
            Ok(()) => report.delivered += 1,
            Err(reason) => report.failed.push((conn.id(), reason)),
        }
    }
    report
}

/// Every send runs concurrently under its own deadline, so one stuck
/// recipient costs at most `send_timeout` and never delays the others.
async fn fan_out_reliable(
    recipients: Vec<Connection>,
    payload: &Payload,
    send_timeout: Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport {
        attempted: recipients.len(),
        ..BroadcastReport::default()
    };

    let mut futs = FuturesUnordered::new();
    for conn in recipients {
        let msg = payload.clone();
        futs.push(async move {
            let res: Result<(), SendFailureReason> = conn.send_within(msg, send_timeout).await;
            (conn.id(), res)
        });
    }

    while let Some((id, res)) = futs.next().await {
        match res {
            Ok(()) => report.delivered += 1,
            Err(reason) => report.failed.push((id, reason)),
        }
    }
    report
}

//! Broadcaster fan-out semantics against in-memory queues.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};

use wsrelay_core::{ConnId, Payload, SendFailureReason};
use wsrelay_gateway::obs::RelayMetrics;
use wsrelay_gateway::realtime::{Broadcaster, Connection, ConnectionRegistry, Delivery};

struct Harness {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<RelayMetrics>,
    broadcaster: Broadcaster,
}

impl Harness {
    fn new(delivery: Delivery) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(RelayMetrics::default());
        let broadcaster = Broadcaster::new(Arc::clone(&registry), delivery, Arc::clone(&metrics));
        Self { registry, metrics, broadcaster }
    }

    fn connect(&self, capacity: usize) -> (ConnId, mpsc::Receiver<Payload>) {
        let (conn, rx) = self.connect_handle(capacity);
        (conn.id(), rx)
    }

    /// Like `connect`, but keeps a handle so the test can pre-fill the queue.
    fn connect_handle(&self, capacity: usize) -> (Connection, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = Connection::new(self.registry.next_id(), tx);
        self.registry.add(conn.clone()).unwrap();
        (conn, rx)
    }
}

fn drain(rx: &mut mpsc::Receiver<Payload>) -> Vec<Payload> {
    let mut out = Vec::new();
    while let Ok(p) = rx.try_recv() {
        out.push(p);
    }
    out
}

#[tokio::test]
async fn sender_is_excluded_and_everyone_else_gets_one_copy() {
    let h = Harness::new(Delivery::Lossy);
    let (a, mut ra) = h.connect(8);
    let (_b, mut rb) = h.connect(8);
    let (_c, mut rc) = h.connect(8);

    let report = h.broadcaster.broadcast(&Payload::from("hello"), Some(a)).await;
    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 2);
    assert!(report.is_clean());

    assert_eq!(drain(&mut rb), vec![Payload::from("hello")]);
    assert_eq!(drain(&mut rc), vec![Payload::from("hello")]);
    assert_eq!(ra.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn no_exclusion_reaches_everyone() {
    let h = Harness::new(Delivery::Lossy);
    let (_a, mut ra) = h.connect(8);
    let (_b, mut rb) = h.connect(8);

    let report = h.broadcaster.broadcast(&Payload::from(vec![1u8, 2, 3]), None).await;
    assert_eq!(report.delivered, 2);
    assert_eq!(drain(&mut ra), vec![Payload::from(vec![1u8, 2, 3])]);
    assert_eq!(drain(&mut rb), vec![Payload::from(vec![1u8, 2, 3])]);
}

#[tokio::test]
async fn lone_sender_broadcasts_to_nobody() {
    let h = Harness::new(Delivery::Lossy);
    let (a, mut ra) = h.connect(8);

    let report = h.broadcaster.broadcast(&Payload::from("echo?"), Some(a)).await;
    assert_eq!(report.attempted, 0);
    assert_eq!(ra.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn failed_recipients_do_not_stop_delivery() {
    let h = Harness::new(Delivery::Lossy);
    let (a, _ra) = h.connect(8);
    let (closed, rx_closed) = h.connect(8);
    let (full_conn, mut rx_full) = h.connect_handle(1);
    let full = full_conn.id();
    let (_ok, mut rx_ok) = h.connect(8);

    drop(rx_closed);
    full_conn.try_send(Payload::from("backlog")).unwrap();

    let report = h.broadcaster.broadcast(&Payload::from("hi"), Some(a)).await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, 1);
    assert!(report.failed.contains(&(closed, SendFailureReason::Closed)));
    assert!(report.failed.contains(&(full, SendFailureReason::QueueFull)));

    assert_eq!(drain(&mut rx_ok), vec![Payload::from("hi")]);
    assert_eq!(drain(&mut rx_full), vec![Payload::from("backlog")]);

    // cleanup belongs to the disconnect path, not the broadcaster
    assert_eq!(h.registry.len(), 4);
    assert_eq!(h.metrics.send_failures.get(&[("reason", "closed")]), 1);
    assert_eq!(h.metrics.send_failures.get(&[("reason", "queue_full")]), 1);
}

#[tokio::test]
async fn reliable_delivery_times_out_only_the_stuck_recipient() {
    let h = Harness::new(Delivery::Reliable { send_timeout: Duration::from_millis(50) });
    let (a, _ra) = h.connect(8);
    let (stuck_conn, _rx_stuck) = h.connect_handle(1);
    let stuck = stuck_conn.id();
    let (_b, mut rb) = h.connect(8);

    stuck_conn.try_send(Payload::from("backlog")).unwrap();

    let report = tokio::time::timeout(
        Duration::from_secs(2),
        h.broadcaster.broadcast(&Payload::from("important"), Some(a)),
    )
    .await
    .expect("a stuck recipient must not stall the broadcast");

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, vec![(stuck, SendFailureReason::Timeout)]);
    assert_eq!(drain(&mut rb), vec![Payload::from("important")]);
    assert_eq!(h.metrics.send_failures.get(&[("reason", "timeout")]), 1);
}

#[tokio::test]
async fn per_connection_order_follows_dispatch_order() {
    let h = Harness::new(Delivery::Reliable { send_timeout: Duration::from_millis(500) });
    let (a, _ra) = h.connect(16);
    let (_b, mut rb) = h.connect(16);

    for i in 0..10 {
        h.broadcaster.broadcast(&Payload::from(i.to_string()), Some(a)).await;
    }

    let got: Vec<Payload> = drain(&mut rb);
    let want: Vec<Payload> = (0..10).map(|i| Payload::from(i.to_string())).collect();
    assert_eq!(got, want);
}

#[tokio::test]
async fn lossy_broadcast_is_recorded_in_metrics() {
    let h = Harness::new(Delivery::Lossy);
    let (a, _ra) = h.connect(8);
    let (_b, mut rb) = h.connect(8);

    let report = h.broadcaster.broadcast(&Payload::from("sync"), Some(a)).await;
    assert_eq!(report.delivered, 1);
    assert_eq!(drain(&mut rb), vec![Payload::from("sync")]);
    assert_eq!(h.metrics.broadcasts.get(&[("mode", "lossy")]), 1);
    assert_eq!(h.metrics.deliveries.get(&[("mode", "lossy")]), 1);
    assert_eq!(h.metrics.broadcast_duration.count(&[("mode", "lossy")]), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_disconnects_during_broadcast() {
    let h = Arc::new(Harness::new(Delivery::Lossy));
    let (sender, _rs) = h.connect(8);
    let (stable, mut rx_stable) = h.connect(1024);

    let mut churn = Vec::new();
    for _ in 0..64 {
        churn.push(h.connect(1024));
    }

    let remover = {
        let h = Arc::clone(&h);
        let ids: Vec<ConnId> = churn.iter().map(|(id, _)| *id).collect();
        tokio::spawn(async move {
            for id in ids {
                h.registry.remove(id);
                h.registry.remove(id);
                tokio::task::yield_now().await;
            }
        })
    };

    for i in 0..100 {
        let report = h.broadcaster.broadcast(&Payload::from(i.to_string()), Some(sender)).await;
        assert!(report.attempted >= 1);
    }
    remover.await.unwrap();

    assert_eq!(h.registry.len(), 2);
    assert!(h.registry.contains(stable));
    assert_eq!(drain(&mut rx_stable).len(), 100);
}

#[tokio::test]
async fn stuck_recipient_keeps_failing_without_affecting_others() {
    let h = Harness::new(Delivery::Lossy);
    let (a, _ra) = h.connect(8);
    let (stuck_conn, _rx_stuck) = h.connect_handle(1);
    let (_b, mut rb) = h.connect(64);
    stuck_conn.try_send(Payload::from("backlog")).unwrap();

    for i in 0..50 {
        let report = h.broadcaster.broadcast(&Payload::from(i.to_string()), Some(a)).await;
        assert_eq!(report.failed, vec![(stuck_conn.id(), SendFailureReason::QueueFull)]);
    }

    assert_eq!(drain(&mut rb).len(), 50);
    assert_eq!(h.metrics.send_failures.get(&[("reason", "queue_full")]), 50);
}

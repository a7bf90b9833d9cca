#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use wsrelay_core::ErrorKind;
use wsrelay_gateway::config::{self, DeliveryMode};
use wsrelay_gateway::realtime::Delivery;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
gateway:
  listen: "0.0.0.0:5001"
  ping_intervall_ms: 20000 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:5001");
    assert_eq!(cfg.gateway.ws_path, "/");
    assert_eq!(cfg.delivery.mode, DeliveryMode::Lossy);
    assert_eq!(Delivery::from(&cfg.delivery), Delivery::Lossy);
}

#[test]
fn reliable_mode_carries_send_timeout() {
    let ok = r#"
version: 1
delivery:
  mode: reliable
  send_timeout_ms: 250
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(
        Delivery::from(&cfg.delivery),
        Delivery::Reliable { send_timeout: Duration::from_millis(250) }
    );
}

#[test]
fn reliable_mode_requires_bounded_timeout() {
    let bad = r#"
version: 1
delivery:
  mode: reliable
  send_timeout_ms: 0
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Config);

    // lossy never waits, so the timeout is irrelevant there
    let ok = r#"
version: 1
delivery:
  mode: lossy
  send_timeout_ms: 0
"#;
    config::load_from_str(ok).expect("lossy ignores send_timeout_ms");
}

#[test]
fn idle_timeout_must_exceed_ping_interval() {
    let bad = r#"
version: 1
gateway:
  ping_interval_ms: 30000
  idle_timeout_ms: 30000
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("idle_timeout_ms"), "{err}");
}

#[test]
fn ws_path_must_not_shadow_ops_endpoints() {
    let bad = r#"
version: 1
gateway:
  ws_path: "/metrics"
"#;
    assert!(config::load_from_str(bad).is_err());

    let bad = r#"
version: 1
gateway:
  ws_path: "relay"
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn unknown_version_is_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
}

#[test]
fn zero_outbound_queue_is_rejected() {
    let bad = r#"
version: 1
gateway:
  outbound_queue: 0
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn write_and_drain_timeouts_are_bounded() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.gateway.write_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.gateway.drain_timeout(), Duration::from_secs(5));

    let bad = r#"
version: 1
gateway:
  write_timeout_ms: 0
"#;
    assert!(config::load_from_str(bad).is_err());

    let bad = r#"
version: 1
gateway:
  drain_timeout_ms: 600000
"#;
    assert!(config::load_from_str(bad).is_err());
}

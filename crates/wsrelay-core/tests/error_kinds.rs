//! Error taxonomy and payload helpers.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use bytes::Bytes;

use wsrelay_core::{ConnId, ErrorKind, Payload, RelayError, SendFailureReason};

#[test]
fn send_failure_maps_to_stable_kind() {
    let err = RelayError::SendFailure {
        conn: ConnId::new(7),
        reason: SendFailureReason::QueueFull,
    };
    assert_eq!(err.kind(), ErrorKind::SendFailure);
    assert_eq!(err.kind().as_str(), "SEND_FAILURE");
    assert_eq!(err.to_string(), "send to c7 failed: queue_full");
}

#[test]
fn io_errors_become_transport_errors() {
    let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
    let err: RelayError = io.into();
    assert_eq!(err.kind().as_str(), "TRANSPORT");
}

#[test]
fn payload_keeps_frame_kind() {
    let text = Payload::from("hello");
    assert_eq!(text.kind(), "text");
    assert_eq!(text, Payload::Text("hello".to_string()));
    assert_eq!(text.len(), 5);

    let bin = Payload::from(vec![0u8, 159, 146, 150]);
    assert_eq!(bin.kind(), "binary");
    assert_eq!(bin, Payload::Binary(Bytes::from_static(&[0, 159, 146, 150])));

    assert!(Payload::from(String::new()).is_empty());
}

//! Lightweight in-process metrics (dependency-free).
//!
//! Counters, gauges and a histogram stored as atomics behind `DashMap` and
//! rendered in Prometheus text format by the `/metrics` handler, plus a
//! throttle for warnings that would otherwise fire at message rate.

pub mod metrics;
pub mod throttle;

pub use metrics::{CounterVec, GaugeVec, HistogramVec, RelayMetrics};
pub use throttle::LogThrottle;

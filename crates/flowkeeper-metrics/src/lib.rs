//! flowkeeper-metrics — observability for the orchestrator loops.
//!
//! Counts what the watcher and supervisor do and renders the totals in
//! Prometheus text format for the `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! OrchestratorMetrics (Arc, shared by both loops)
//!   ├── record_*() ← called by watcher / supervisor
//!   └── snapshot() → MetricsSnapshot
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod counters;
pub mod prometheus;

pub use counters::{MetricsSnapshot, OrchestratorMetrics};
pub use prometheus::render_prometheus;

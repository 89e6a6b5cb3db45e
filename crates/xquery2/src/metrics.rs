//! Prometheus metrics, one `#[derive(MetricStorage)]` struct per process.

use prometheus::{IntCounter, IntCounterVec, IntGauge};
use prometheus_metric_storage::MetricStorage;

#[derive(MetricStorage)]
#[metric(subsystem = "xquery2")]
pub struct Metrics {
    /// Index jobs submitted by the controller's scan loop.
    pub index_jobs_submitted: IntCounter,
    /// Index jobs committed by the coordinator.
    pub index_jobs_committed: IntCounter,
    /// Process jobs submitted per stage.
    #[metric(labels("stage"))]
    pub process_jobs_submitted: IntCounterVec,
    /// Process jobs committed per stage.
    #[metric(labels("stage"))]
    pub process_jobs_committed: IntCounterVec,
    /// Current size of the commit coordinator's out-of-order reorder buffer.
    pub reorder_buffer_size: IntGauge,
    /// `eth_getLogs`/RPC retries due to transient errors (429, 5xx, timeout).
    pub rpc_retries: IntCounter,
    /// Current adaptive chunk size used by the scan loop.
    pub scan_chunk_size: IntGauge,
}

impl Metrics {
    /// Registers (or returns the already-registered) process-wide metrics instance
    /// against the default Prometheus registry.
    pub fn get() -> &'static Metrics {
        Self::instance(prometheus::default_registry()).expect("failed to register xquery2 metrics")
    }
}

//! Metrics collection and Prometheus export.
//!
//! Counters are recorded through the `metrics` facade. Until `init_metrics`
//! installs the Prometheus recorder they are no-ops, so unit tests can call
//! the recording helpers freely.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::models::PermissionLevel;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls are ignored.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder already installed"),
    }
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_permission_decision(level: PermissionLevel, allowed: bool) {
    let outcome = if allowed { "allowed" } else { "denied" };
    counter!(
        "permission_decisions_total",
        "level" => level.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_documents_filtered(count: usize) {
    counter!("documents_filtered_total").increment(count as u64);
}

/// `action` is `inserted` or `updated`.
pub fn record_grant_upsert(action: &'static str) {
    counter!("grant_upserts_total", "action" => action).increment(1);
}

pub fn record_integrity_anomaly() {
    counter!("integrity_anomalies_total").increment(1);
}

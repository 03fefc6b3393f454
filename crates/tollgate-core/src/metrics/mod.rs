//! Admission metrics.
//!
//! Counters on the `metrics` facade, recorded on the request hot path with static
//! labels (no allocation). Installing an exporter is the embedding service's concern;
//! without a recorder these are no-ops.

use metrics::counter;

/// Records one metering decision, labeled by admission path and outcome.
pub fn record_admission(path: &'static str, outcome: &'static str) {
    counter!("tollgate_meter_requests_total", "path" => path, "outcome" => outcome).increment(1);
}

/// Records the symbols charged by an accepted request.
pub fn record_symbols_charged(path: &'static str, symbols: u64) {
    counter!("tollgate_meter_symbols_charged_total", "path" => path).increment(symbols);
}

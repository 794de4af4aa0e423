use std::time::Instant;
use tracing::debug;

/// Stage names recorded against `sor_stage_duration_seconds`.
pub const STAGE_GAS_PRICE: &str = "gas_price";
pub const STAGE_POOL_SELECTION: &str = "pool_selection";
pub const STAGE_ROUTE_ENUMERATION: &str = "route_enumeration";
pub const STAGE_QUOTING: &str = "quoting";
pub const STAGE_OPTIMIZATION: &str = "optimization";

/// Record one pipeline stage's wall time as a histogram sample and a debug
/// log line. The recorder, if any, is installed by the embedder.
pub fn record_stage(stage: &'static str, started: Instant) {
    let elapsed = started.elapsed();
    metrics::histogram!("sor_stage_duration_seconds", "stage" => stage)
        .record(elapsed.as_secs_f64());
    debug!(stage, time_ms = elapsed.as_secs_f64() * 1000.0, "Stage complete");
}

pub fn record_request(success: bool) {
    metrics::counter!("sor_requests_total").increment(1);
    if !success {
        metrics::counter!("sor_requests_failed_total").increment(1);
    }
}

// src/sla.rs

use tracing::info;

use crate::error::{ensure_non_negative, TwinError, TwinResult};
use crate::types::{ResultSeries, Seconds, SlaResult, SlaSpec};

/// Check the FIFO latency of every hour against `latency_limit`.
///
/// An hour is within the limit when its latency is strictly below it. The SLA
/// is met when at least `required_pct` percent of hours are. Both thresholds
/// must be finite and non-negative.
pub fn evaluate(results: &ResultSeries, latency_limit: Seconds, required_pct: f64) -> TwinResult<SlaResult> {
    ensure_non_negative("latency_sla_limit", latency_limit)?;
    ensure_non_negative("latency_sla_percent", required_pct)?;
    if results.is_empty() {
        return Err(TwinError::EmptySeries);
    }

    let within = results.iter().filter(|row| row.latency_fifo < latency_limit).count();
    let pct_time_within_limit = 100.0 * within as f64 / results.len() as f64;
    let met = pct_time_within_limit >= required_pct;

    if met {
        info!(
            "Latency SLA met: {:.2}% of hours under {}s (required {}%)",
            pct_time_within_limit, latency_limit, required_pct
        );
    } else {
        info!(
            "Latency SLA NOT met: {:.2}% of hours under {}s (required {}%)",
            pct_time_within_limit, latency_limit, required_pct
        );
    }

    Ok(SlaResult {
        met,
        pct_time_within_limit,
    })
}

/// [`evaluate`] with the limits of an [`SlaSpec`]
pub fn evaluate_spec(results: &ResultSeries, sla: &SlaSpec) -> TwinResult<SlaResult> {
    evaluate(results, sla.latency_sla_limit, sla.latency_sla_percent)
}

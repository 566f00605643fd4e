//! Convenience builders for common pipeline models

use std::str::FromStr;

use crate::error::{ensure_non_negative, ensure_positive, TwinResult};
use crate::models::{AutoscalingParams, ModelParams, QuickScalingParams, SimpleParams};
use crate::types::{Cost, Policy, RecordCount, Seconds, SECONDS_PER_HOUR};

/// Scale up when throughput passes this share of capacity
pub const DEFAULT_UP_PCT_TRIGGER: f64 = 80.0;
/// Hours of sustained load before scaling up
pub const DEFAULT_UP_DELAY_H: u32 = 2;
/// Scale down when throughput drops under this share of capacity
pub const DEFAULT_DOWN_PCT_TRIGGER: f64 = 20.0;
/// Hours of sustained idling before scaling down
pub const DEFAULT_DOWN_DELAY_H: u32 = 2;

/// Create a single fixed-size pipeline
pub fn simple_model(
    maxrate_rph: f64,
    per_vm_hourcost: Cost,
    avg_latency_s: Seconds,
    policy: &str,
) -> TwinResult<ModelParams> {
    Ok(ModelParams::Simple(SimpleParams::new(
        maxrate_rph,
        per_vm_hourcost,
        avg_latency_s,
        policy,
    )?))
}

/// Create a pipeline that resizes instantly to hourly demand
pub fn quickscaling_model(fixed_hourcost: Cost, base: SimpleParams) -> TwinResult<ModelParams> {
    let params = ModelParams::QuickScaling(QuickScalingParams { fixed_hourcost, base });
    params.validate()?;
    Ok(params)
}

/// Create an hourly autoscaling pipeline with the usual triggers (80% / 2 h up, 20% / 2 h down)
pub fn autoscaling_model(fixed_hourcost: Cost, base: SimpleParams) -> TwinResult<ModelParams> {
    let params = ModelParams::Autoscaling(AutoscalingParams {
        fixed_hourcost,
        up_pct_trigger: DEFAULT_UP_PCT_TRIGGER,
        up_delay: DEFAULT_UP_DELAY_H,
        down_pct_trigger: DEFAULT_DOWN_PCT_TRIGGER,
        down_delay: DEFAULT_DOWN_DELAY_H,
        base,
    });
    params.validate()?;
    Ok(params)
}

/// Create a second-resolution autoscaling pipeline; delays are in seconds
pub fn autoscaling_fine_model(
    fixed_hourcost: Cost,
    base: SimpleParams,
    up_pct_trigger: f64,
    up_delay_s: u32,
    down_pct_trigger: f64,
    down_delay_s: u32,
) -> TwinResult<ModelParams> {
    let params = ModelParams::AutoscalingFine(AutoscalingParams {
        fixed_hourcost,
        up_pct_trigger,
        up_delay: up_delay_s,
        down_pct_trigger,
        down_delay: down_delay_s,
        base,
    });
    params.validate()?;
    Ok(params)
}

/// Derive a simple model from one measured experiment.
///
/// The rate is what the pipeline sustained over the experiment and the hourly
/// cost is the experiment's cost spread over its duration.
pub fn calibrate_simple(
    records_injected: RecordCount,
    span_s: Seconds,
    total_cost: Cost,
    mean_latency_s: Seconds,
    policy: &str,
) -> TwinResult<SimpleParams> {
    ensure_positive("experiment span", span_s)?;
    ensure_non_negative("records injected", records_injected)?;
    ensure_non_negative("experiment cost", total_cost)?;

    let hours = span_s / f64::from(SECONDS_PER_HOUR);
    let params = SimpleParams {
        maxrate_rph: records_injected / hours,
        per_vm_hourcost: total_cost / hours,
        avg_latency_s: mean_latency_s,
        policy: Policy::from_str(policy)?,
    };
    params.validate()?;
    Ok(params)
}

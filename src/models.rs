// src/models.rs

//! Pipeline capacity models.
//!
//! Every model consumes one time-step's incoming record count, updates its
//! queue, cost and scaling state, and reports [`StepMetrics`]. The hourly
//! models advance one hour per step; [`AutoscalingFineModel`] also advances one
//! hour per call but simulates it as 3600 one-second sub-steps.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, TwinError, TwinResult};
use crate::queue::FluidQueue;
use crate::scaling::{HysteresisScaler, ScalingRule};
use crate::types::{Cost, Policy, RecordCount, Seconds, StepMetrics, SECONDS_PER_HOUR};

/// Parameters of a single, fixed-size pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimpleParams {
    /// Max records per hour one pipeline unit can process
    pub maxrate_rph: f64,
    /// Cost per hour of one pipeline unit
    pub per_vm_hourcost: Cost,
    /// Average end-to-end latency with no queueing
    pub avg_latency_s: Seconds,
    pub policy: Policy,
}

impl SimpleParams {
    /// Build from a policy token, rejecting unknown tokens
    pub fn new(
        maxrate_rph: f64,
        per_vm_hourcost: Cost,
        avg_latency_s: Seconds,
        policy: &str,
    ) -> TwinResult<Self> {
        let params = Self {
            maxrate_rph,
            per_vm_hourcost,
            avg_latency_s,
            policy: Policy::from_str(policy)?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> TwinResult<()> {
        ensure_positive("maxrate_rph", self.maxrate_rph)?;
        ensure_non_negative("per_vm_hourcost", self.per_vm_hourcost)?;
        ensure_non_negative("avg_latency_s", self.avg_latency_s)
    }
}

/// A pipeline that resizes every hour to exactly match demand
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuickScalingParams {
    /// Cost per hour independent of the number of units
    pub fixed_hourcost: Cost,
    #[serde(flatten)]
    pub base: SimpleParams,
}

impl QuickScalingParams {
    pub fn validate(&self) -> TwinResult<()> {
        self.base.validate()?;
        ensure_non_negative("fixed_hourcost", self.fixed_hourcost)
    }
}

/// A pipeline driven by the hysteresis autoscaler.
///
/// Delays are counted in time-steps of the model using the parameters: hours
/// for [`AutoscalingModel`], seconds for [`AutoscalingFineModel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoscalingParams {
    pub fixed_hourcost: Cost,
    /// Scale up when mean throughput exceeds this percentage of capacity
    pub up_pct_trigger: f64,
    /// Steps to wait (and to average over) before scaling up
    pub up_delay: u32,
    /// Scale down when mean throughput falls below this percentage of capacity
    pub down_pct_trigger: f64,
    /// Steps to wait (and to average over) before scaling down
    pub down_delay: u32,
    #[serde(flatten)]
    pub base: SimpleParams,
}

impl AutoscalingParams {
    pub fn validate(&self) -> TwinResult<()> {
        self.base.validate()?;
        ensure_non_negative("fixed_hourcost", self.fixed_hourcost)?;
        ensure_positive("up_pct_trigger", self.up_pct_trigger)?;
        ensure_non_negative("down_pct_trigger", self.down_pct_trigger)?;
        if self.up_delay == 0 || self.down_delay == 0 {
            return Err(TwinError::invalid_parameter(format!(
                "Scaling delays must be at least one step (up_delay={}, down_delay={})",
                self.up_delay, self.down_delay
            )));
        }
        Ok(())
    }

    pub fn rule(&self) -> ScalingRule {
        ScalingRule {
            up_pct_trigger: self.up_pct_trigger,
            up_delay: self.up_delay,
            down_pct_trigger: self.down_pct_trigger,
            down_delay: self.down_delay,
        }
    }
}

/// Model parameters tagged with the model type they construct
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type")]
pub enum ModelParams {
    #[serde(rename = "simple")]
    Simple(SimpleParams),
    #[serde(rename = "quickscaling")]
    QuickScaling(QuickScalingParams),
    #[serde(rename = "autoscaling")]
    Autoscaling(AutoscalingParams),
    #[serde(rename = "autoscaling_fine")]
    AutoscalingFine(AutoscalingParams),
}

impl ModelParams {
    /// Every discriminant accepted in serialized form
    pub const MODEL_TYPES: [&'static str; 4] = ["simple", "quickscaling", "autoscaling", "autoscaling_fine"];

    pub fn model_type(&self) -> &'static str {
        match self {
            ModelParams::Simple(_) => "simple",
            ModelParams::QuickScaling(_) => "quickscaling",
            ModelParams::Autoscaling(_) => "autoscaling",
            ModelParams::AutoscalingFine(_) => "autoscaling_fine",
        }
    }

    pub fn base(&self) -> &SimpleParams {
        match self {
            ModelParams::Simple(p) => p,
            ModelParams::QuickScaling(p) => &p.base,
            ModelParams::Autoscaling(p) | ModelParams::AutoscalingFine(p) => &p.base,
        }
    }

    pub fn policy(&self) -> Policy {
        self.base().policy
    }

    pub fn validate(&self) -> TwinResult<()> {
        match self {
            ModelParams::Simple(p) => p.validate(),
            ModelParams::QuickScaling(p) => p.validate(),
            ModelParams::Autoscaling(p) | ModelParams::AutoscalingFine(p) => p.validate(),
        }
    }
}

/// Step contract shared by all capacity models
pub trait CapacityModel: Send {
    /// Model type discriminant
    fn name(&self) -> &'static str;

    /// Return to the zero state: empty queue, one unit, no cost
    fn reset(&mut self);

    /// Advance exactly one time unit with `incoming` new records
    fn step(&mut self, incoming: RecordCount) -> StepMetrics;

    fn numproc(&self) -> u32;

    fn queue(&self) -> RecordCount;

    fn cumulative_cost(&self) -> Cost;
}

/// Always one unit, constant hourly cost
#[derive(Debug, Clone)]
pub struct FixedModel {
    params: SimpleParams,
    queue: FluidQueue,
    cumulative_cost: Cost,
}

impl FixedModel {
    pub fn new(params: SimpleParams) -> TwinResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            queue: FluidQueue::new(),
            cumulative_cost: 0.0,
        })
    }

    pub fn params(&self) -> &SimpleParams {
        &self.params
    }
}

impl CapacityModel for FixedModel {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn reset(&mut self) {
        self.queue.reset();
        self.cumulative_cost = 0.0;
    }

    fn step(&mut self, incoming: RecordCount) -> StepMetrics {
        let q = self.queue.advance(
            incoming,
            self.params.maxrate_rph,
            self.params.avg_latency_s,
            f64::from(SECONDS_PER_HOUR),
        );
        let cost = self.params.per_vm_hourcost;
        self.cumulative_cost += cost;

        StepMetrics {
            throughput: q.throughput,
            latency_fifo: q.latency_fifo,
            latency_lifo: q.latency_lifo,
            queue: q.queue,
            cost,
            numproc: 1,
        }
    }

    fn numproc(&self) -> u32 {
        1
    }

    fn queue(&self) -> RecordCount {
        self.queue.len()
    }

    fn cumulative_cost(&self) -> Cost {
        self.cumulative_cost
    }
}

/// Units needed to serve `incoming` in one step, never less than one
fn units_for(incoming: RecordCount, unit_capacity: RecordCount) -> u32 {
    // `as` saturates, so absurd demand pins at u32::MAX instead of wrapping
    let mut units = (incoming / unit_capacity).ceil().max(1.0) as u32;
    while f64::from(units) * unit_capacity < incoming && units < u32::MAX {
        units += 1;
    }
    units
}

/// Lag-free scaling: each hour runs exactly the units its demand needs
#[derive(Debug, Clone)]
pub struct QuickScalingModel {
    params: QuickScalingParams,
    queue: FluidQueue,
    numproc: u32,
    cumulative_cost: Cost,
}

impl QuickScalingModel {
    pub fn new(params: QuickScalingParams) -> TwinResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            queue: FluidQueue::new(),
            numproc: 1,
            cumulative_cost: 0.0,
        })
    }

    pub fn params(&self) -> &QuickScalingParams {
        &self.params
    }
}

impl CapacityModel for QuickScalingModel {
    fn name(&self) -> &'static str {
        "quickscaling"
    }

    fn reset(&mut self) {
        self.queue.reset();
        self.numproc = 1;
        self.cumulative_cost = 0.0;
    }

    fn step(&mut self, incoming: RecordCount) -> StepMetrics {
        let base = &self.params.base;
        self.numproc = units_for(incoming, base.maxrate_rph);

        let q = self.queue.advance(
            incoming,
            base.maxrate_rph * f64::from(self.numproc),
            base.avg_latency_s,
            f64::from(SECONDS_PER_HOUR),
        );
        let cost = self.params.fixed_hourcost + base.per_vm_hourcost * f64::from(self.numproc);
        self.cumulative_cost += cost;

        StepMetrics {
            throughput: q.throughput,
            latency_fifo: q.latency_fifo,
            latency_lifo: q.latency_lifo,
            queue: q.queue,
            cost,
            numproc: self.numproc,
        }
    }

    fn numproc(&self) -> u32 {
        self.numproc
    }

    fn queue(&self) -> RecordCount {
        self.queue.len()
    }

    fn cumulative_cost(&self) -> Cost {
        self.cumulative_cost
    }
}

/// Hourly hysteresis autoscaling
#[derive(Debug, Clone)]
pub struct AutoscalingModel {
    params: AutoscalingParams,
    queue: FluidQueue,
    scaler: HysteresisScaler,
    cumulative_cost: Cost,
}

impl AutoscalingModel {
    pub fn new(params: AutoscalingParams) -> TwinResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            queue: FluidQueue::new(),
            scaler: HysteresisScaler::new(params.rule()),
            cumulative_cost: 0.0,
        })
    }

    pub fn params(&self) -> &AutoscalingParams {
        &self.params
    }

    pub fn time_since_last_scale(&self) -> u64 {
        self.scaler.time_since_last_scale()
    }
}

impl CapacityModel for AutoscalingModel {
    fn name(&self) -> &'static str {
        "autoscaling"
    }

    fn reset(&mut self) {
        self.queue.reset();
        self.scaler.reset();
        self.cumulative_cost = 0.0;
    }

    fn step(&mut self, incoming: RecordCount) -> StepMetrics {
        let base = &self.params.base;
        let numproc = f64::from(self.scaler.numproc());

        let q = self.queue.advance(
            incoming,
            base.maxrate_rph * numproc,
            base.avg_latency_s,
            f64::from(SECONDS_PER_HOUR),
        );
        let cost = self.params.fixed_hourcost + base.per_vm_hourcost * numproc;
        self.cumulative_cost += cost;
        self.scaler.observe(q.throughput, base.maxrate_rph);

        StepMetrics {
            throughput: q.throughput,
            latency_fifo: q.latency_fifo,
            latency_lifo: q.latency_lifo,
            queue: q.queue,
            cost,
            numproc: self.scaler.numproc(),
        }
    }

    fn numproc(&self) -> u32 {
        self.scaler.numproc()
    }

    fn queue(&self) -> RecordCount {
        self.queue.len()
    }

    fn cumulative_cost(&self) -> Cost {
        self.cumulative_cost
    }
}

/// Split an hour's records across one-second slots as evenly as integers allow.
///
/// Fractional records are truncated; the first `n % 3600` slots carry one extra.
pub fn spread_over_seconds(records_this_hour: RecordCount) -> impl Iterator<Item = RecordCount> {
    let total = if records_this_hour.is_finite() && records_this_hour > 0.0 {
        records_this_hour.trunc() as u64
    } else {
        0
    };
    let slots = u64::from(SECONDS_PER_HOUR);
    let per_slot = total / slots;
    let remainder = total % slots;
    (0..slots).map(move |slot| (per_slot + u64::from(slot < remainder)) as f64)
}

/// Hysteresis autoscaling simulated second by second.
///
/// Each call to `step` consumes one hour of records; delays are in seconds.
#[derive(Debug, Clone)]
pub struct AutoscalingFineModel {
    params: AutoscalingParams,
    queue: FluidQueue,
    scaler: HysteresisScaler,
    cumulative_cost: Cost,
    maxrate_per_s: f64,
}

impl AutoscalingFineModel {
    pub fn new(params: AutoscalingParams) -> TwinResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            queue: FluidQueue::new(),
            scaler: HysteresisScaler::new(params.rule()),
            cumulative_cost: 0.0,
            maxrate_per_s: params.base.maxrate_rph / f64::from(SECONDS_PER_HOUR),
        })
    }

    pub fn params(&self) -> &AutoscalingParams {
        &self.params
    }
}

impl CapacityModel for AutoscalingFineModel {
    fn name(&self) -> &'static str {
        "autoscaling_fine"
    }

    fn reset(&mut self) {
        self.queue.reset();
        self.scaler.reset();
        self.cumulative_cost = 0.0;
    }

    fn step(&mut self, incoming: RecordCount) -> StepMetrics {
        let base = self.params.base;
        let seconds = f64::from(SECONDS_PER_HOUR);
        let mut hour_throughput = 0.0;
        let mut hour_cost = 0.0;
        let mut last = None;

        for records_this_second in spread_over_seconds(incoming) {
            let numproc = f64::from(self.scaler.numproc());
            let q = self.queue.advance(
                records_this_second,
                self.maxrate_per_s * numproc,
                base.avg_latency_s,
                1.0,
            );
            hour_throughput += q.throughput;
            hour_cost += (self.params.fixed_hourcost + base.per_vm_hourcost * numproc) / seconds;
            self.scaler.observe(q.throughput, self.maxrate_per_s);
            last = Some(q);
        }
        self.cumulative_cost += hour_cost;

        let (latency_fifo, latency_lifo) = last
            .map(|q| (q.latency_fifo, q.latency_lifo))
            .unwrap_or((base.avg_latency_s, base.avg_latency_s));

        StepMetrics {
            throughput: hour_throughput,
            latency_fifo,
            latency_lifo,
            queue: self.queue.len(),
            cost: hour_cost,
            numproc: self.scaler.numproc(),
        }
    }

    fn numproc(&self) -> u32 {
        self.scaler.numproc()
    }

    fn queue(&self) -> RecordCount {
        self.queue.len()
    }

    fn cumulative_cost(&self) -> Cost {
        self.cumulative_cost
    }
}

/// The closed set of capacity models, selected by [`ModelParams`]
#[derive(Debug, Clone)]
pub enum PipelineModel {
    Fixed(FixedModel),
    QuickScaling(QuickScalingModel),
    Autoscaling(AutoscalingModel),
    AutoscalingFine(AutoscalingFineModel),
}

impl PipelineModel {
    /// Validate `params` and construct the matching model in its zero state
    pub fn from_params(params: ModelParams) -> TwinResult<Self> {
        Ok(match params {
            ModelParams::Simple(p) => PipelineModel::Fixed(FixedModel::new(p)?),
            ModelParams::QuickScaling(p) => PipelineModel::QuickScaling(QuickScalingModel::new(p)?),
            ModelParams::Autoscaling(p) => PipelineModel::Autoscaling(AutoscalingModel::new(p)?),
            ModelParams::AutoscalingFine(p) => {
                PipelineModel::AutoscalingFine(AutoscalingFineModel::new(p)?)
            }
        })
    }

    /// Parameters this model was built from
    pub fn params(&self) -> ModelParams {
        match self {
            PipelineModel::Fixed(m) => ModelParams::Simple(*m.params()),
            PipelineModel::QuickScaling(m) => ModelParams::QuickScaling(*m.params()),
            PipelineModel::Autoscaling(m) => ModelParams::Autoscaling(*m.params()),
            PipelineModel::AutoscalingFine(m) => ModelParams::AutoscalingFine(*m.params()),
        }
    }

    fn inner(&self) -> &dyn CapacityModel {
        match self {
            PipelineModel::Fixed(m) => m,
            PipelineModel::QuickScaling(m) => m,
            PipelineModel::Autoscaling(m) => m,
            PipelineModel::AutoscalingFine(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn CapacityModel {
        match self {
            PipelineModel::Fixed(m) => m,
            PipelineModel::QuickScaling(m) => m,
            PipelineModel::Autoscaling(m) => m,
            PipelineModel::AutoscalingFine(m) => m,
        }
    }
}

impl CapacityModel for PipelineModel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn step(&mut self, incoming: RecordCount) -> StepMetrics {
        self.inner_mut().step(incoming)
    }

    fn numproc(&self) -> u32 {
        self.inner().numproc()
    }

    fn queue(&self) -> RecordCount {
        self.inner().queue()
    }

    fn cumulative_cost(&self) -> Cost {
        self.inner().cumulative_cost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(maxrate_rph: f64) -> SimpleParams {
        SimpleParams {
            maxrate_rph,
            per_vm_hourcost: 2.0,
            avg_latency_s: 1.5,
            policy: Policy::Fifo,
        }
    }

    fn autoscaling(maxrate_rph: f64, up_delay: u32, down_delay: u32) -> AutoscalingParams {
        AutoscalingParams {
            fixed_hourcost: 0.5,
            up_pct_trigger: 80.0,
            up_delay,
            down_pct_trigger: 20.0,
            down_delay,
            base: base(maxrate_rph),
        }
    }

    #[test]
    fn test_unknown_policy_token() {
        let err = SimpleParams::new(100.0, 1.0, 1.0, "priority").unwrap_err();
        assert!(matches!(err, TwinError::InvalidPolicy { ref policy } if policy == "priority"));
        assert!(SimpleParams::new(100.0, 1.0, 1.0, "random").is_ok());
    }

    #[test]
    fn test_zero_maxrate_rejected() {
        for maxrate in [0.0, -5.0, f64::NAN] {
            let err = FixedModel::new(base(maxrate)).unwrap_err();
            assert!(matches!(err, TwinError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_zero_delay_rejected() {
        let err = AutoscalingModel::new(autoscaling(100.0, 0, 2)).unwrap_err();
        assert!(matches!(err, TwinError::InvalidParameter { .. }));
    }

    #[test]
    fn test_fixed_cost_is_constant() {
        let mut m = FixedModel::new(base(100.0)).unwrap();
        let a = m.step(10.0);
        let b = m.step(1000.0);
        assert_eq!(a.cost, 2.0);
        assert_eq!(b.cost, 2.0);
        assert_eq!(m.cumulative_cost(), 4.0);
        assert_eq!(b.numproc, 1);
    }

    #[test]
    fn test_fixed_lifo_age_counts_hours() {
        let mut m = FixedModel::new(base(100.0)).unwrap();
        m.step(200.0);
        let s = m.step(100.0);
        assert_eq!(s.queue, 100.0);
        assert_eq!(s.latency_lifo, 1.5 + 7200.0);
    }

    #[test]
    fn test_quickscaling_units_match_demand() {
        let mut m = QuickScalingModel::new(QuickScalingParams {
            fixed_hourcost: 1.0,
            base: base(100.0),
        })
        .unwrap();

        let s = m.step(250.0);
        assert_eq!(s.numproc, 3);
        assert_eq!(s.throughput, 250.0);
        assert_eq!(s.cost, 1.0 + 2.0 * 3.0);

        // Idle hours keep one unit
        let s = m.step(0.0);
        assert_eq!(s.numproc, 1);
        assert_eq!(s.queue, 0.0);
    }

    #[test]
    fn test_units_for_covers_demand() {
        assert_eq!(units_for(0.0, 10.0), 1);
        assert_eq!(units_for(10.0, 10.0), 1);
        assert_eq!(units_for(10.000001, 10.0), 2);
        let demand = 0.3;
        let units = units_for(demand, 0.1);
        assert!(f64::from(units) * 0.1 >= demand);
    }

    #[test]
    fn test_autoscaling_cost_uses_units_before_scaling() {
        let mut m = AutoscalingModel::new(autoscaling(100.0, 1, 5)).unwrap();
        let s = m.step(100.0);
        // Scaled up at the end of the step, billed for one unit
        assert_eq!(s.numproc, 2);
        assert_eq!(s.cost, 0.5 + 2.0);
        let s = m.step(100.0);
        assert_eq!(s.cost, 0.5 + 4.0);
    }

    #[test]
    fn test_spread_over_seconds() {
        let slots: Vec<f64> = spread_over_seconds(7201.9).collect();
        assert_eq!(slots.len(), 3600);
        assert_eq!(slots.iter().sum::<f64>(), 7201.0);
        assert_eq!(slots[0], 3.0);
        assert_eq!(slots[1], 2.0);

        let slots: Vec<f64> = spread_over_seconds(1800.0).collect();
        assert_eq!(slots[1799], 1.0);
        assert_eq!(slots[1800], 0.0);

        assert!(spread_over_seconds(-3.0).all(|s| s == 0.0));
    }

    #[test]
    fn test_fine_model_accumulates_hour() {
        let mut m = AutoscalingFineModel::new(autoscaling(36_000.0, 60, 60)).unwrap();
        let s = m.step(7200.0);
        assert_eq!(s.throughput, 7200.0);
        assert_eq!(s.numproc, 1);
        assert!((s.cost - 2.5).abs() < 1e-9);
        assert!((m.cumulative_cost() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_pipeline_model_dispatch() {
        let params = ModelParams::QuickScaling(QuickScalingParams {
            fixed_hourcost: 0.0,
            base: base(100.0),
        });
        let mut model = PipelineModel::from_params(params).unwrap();
        assert_eq!(model.name(), "quickscaling");
        assert_eq!(model.params(), params);
        model.step(450.0);
        assert_eq!(model.numproc(), 5);
        model.reset();
        assert_eq!(model.numproc(), 1);
        assert_eq!(model.cumulative_cost(), 0.0);
    }
}

// src/summary.rs

use serde::{Deserialize, Serialize};

use crate::error::{TwinError, TwinResult};
use crate::sla;
use crate::types::{Cost, RecordCount, ResultSeries, Seconds, SlaResult, SlaSpec};
use crate::utils::mean_and_max;

/// Aggregate figures published next to each simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub hours: usize,
    pub total_cost: Cost,
    pub total_incoming: RecordCount,
    pub total_throughput: RecordCount,
    /// FIFO latency
    pub avg_latency_s: Seconds,
    pub max_latency_s: Seconds,
    pub avg_queue: RecordCount,
    pub max_queue: RecordCount,
    pub avg_throughput_rph: RecordCount,
    pub max_throughput_rph: RecordCount,
    pub max_numproc: u32,
    pub sla_check: SlaResult,
}

impl SimulationSummary {
    pub fn from_results(results: &ResultSeries, sla: &SlaSpec) -> TwinResult<Self> {
        let sla_check = sla::evaluate_spec(results, sla)?;

        let (avg_latency_s, max_latency_s) =
            mean_and_max(results.iter().map(|r| r.latency_fifo)).ok_or(TwinError::EmptySeries)?;
        let (avg_queue, max_queue) =
            mean_and_max(results.iter().map(|r| r.queue_len)).ok_or(TwinError::EmptySeries)?;
        let (avg_throughput_rph, max_throughput_rph) =
            mean_and_max(results.iter().map(|r| r.throughput)).ok_or(TwinError::EmptySeries)?;

        Ok(Self {
            hours: results.len(),
            total_cost: results.total_cost(),
            total_incoming: results.total_incoming(),
            total_throughput: results.total_throughput(),
            avg_latency_s,
            max_latency_s,
            avg_queue,
            max_queue,
            avg_throughput_rph,
            max_throughput_rph,
            max_numproc: results.iter().map(|r| r.numproc).max().unwrap_or(1),
            sla_check,
        })
    }

    /// Average cost of one processed record, if anything was processed
    pub fn cost_per_record(&self) -> Option<Cost> {
        (self.total_throughput > 0.0).then(|| self.total_cost / self.total_throughput)
    }
}

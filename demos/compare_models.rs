// demos/compare_models.rs
//! Compare every capacity model on the same forecast
//!
//! This example demonstrates:
//! - Calibrating a pipeline from one measured experiment
//! - Running all model variants concurrently as a batch
//! - Cancelling long runs with a shared flag
//!
//! Run with: cargo run --example compare_models

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use pipetwin::{
    autoscaling_fine_model, autoscaling_model, calibrate_simple, quickscaling_model, CancelFlag, ForecastParams,
    ModelParams, PipelineModel, SimulationJob, SimulationRunner, TwinError, TwinResult,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn date(year: i32, month: u32, day: u32) -> TwinResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| TwinError::invalid_parameter(format!("{}-{}-{} is not a date", year, month, day)))
}

#[tokio::main]
async fn main() -> TwinResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pipetwin=warn")))
        .init();

    // 180k records pushed through in 20 minutes, costing 0.40
    let pipeline = calibrate_simple(180_000.0, 1_200.0, 0.40, 6.5, "fifo")?;
    println!(
        "🔧 Calibrated pipeline: {:.0} records/h at {:.2}/h",
        pipeline.maxrate_rph, pipeline.per_vm_hourcost
    );

    let from = date(2025, 11, 1)?;
    let to = date(2025, 11, 7)?;
    let forecast = Arc::new(ForecastParams::new("ingest", 900_000.0, 1.0).generate(from, to)?);

    let candidates: Vec<ModelParams> = vec![
        ModelParams::Simple(pipeline),
        quickscaling_model(0.05, pipeline)?,
        autoscaling_model(0.05, pipeline)?,
        autoscaling_fine_model(0.05, pipeline, 80.0, 900, 20.0, 1_800)?,
    ];

    let jobs = candidates
        .into_iter()
        .map(|params| -> TwinResult<SimulationJob> {
            let model = PipelineModel::from_params(params)?;
            Ok(SimulationJob::new(params.model_type(), forecast.clone(), model))
        })
        .collect::<TwinResult<Vec<_>>>()?;

    // Give up if the batch takes unreasonably long
    let cancel = CancelFlag::new();
    let watchdog = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(120)).await;
            cancel.cancel();
        })
    };

    let runner = SimulationRunner::new().with_cancel_flag(cancel);
    let outcomes = match runner.run_batch(jobs).await {
        Ok(outcomes) => outcomes,
        Err(TwinError::Cancelled { completed_steps }) => {
            warn!("Batch cancelled after {} steps", completed_steps);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    watchdog.abort();

    println!("{:<18} {:>12} {:>12} {:>12} {:>8} {:>6}", "model", "cost", "max lat s", "max queue", "units", "SLA");
    for outcome in &outcomes {
        let s = &outcome.summary;
        println!(
            "{:<18} {:>12.2} {:>12.1} {:>12.0} {:>8} {:>6}",
            outcome.name,
            s.total_cost,
            s.max_latency_s,
            s.max_queue,
            s.max_numproc,
            if s.sla_check.met { "yes" } else { "no" }
        );
    }

    Ok(())
}

// src/runner.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::callbacks::{RunContext, SimulationCallbacks, SimulationObserver};
use crate::config::SimulationConfig;
use crate::error::{TwinError, TwinResult};
use crate::forecast::ForecastSeries;
use crate::models::{CapacityModel, ModelParams, PipelineModel};
use crate::summary::SimulationSummary;
use crate::types::{ResultRow, ResultSeries, ScaleDirection, ScaleEvent, SlaSpec};

/// Shared flag used to abort runs between two time-steps
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One independent run for [`SimulationRunner::run_batch`]
#[derive(Debug, Clone)]
pub struct SimulationJob {
    pub name: String,
    pub forecast: Arc<ForecastSeries>,
    pub model: PipelineModel,
    pub sla: SlaSpec,
}

impl SimulationJob {
    pub fn new<S: Into<String>>(name: S, forecast: Arc<ForecastSeries>, model: PipelineModel) -> Self {
        Self {
            name: name.into(),
            forecast,
            model,
            sla: SlaSpec::default(),
        }
    }

    pub fn with_sla(mut self, sla: SlaSpec) -> Self {
        self.sla = sla;
        self
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub name: String,
    pub model: ModelParams,
    pub results: ResultSeries,
    pub summary: SimulationSummary,
}

/// Drives a capacity model over a forecast, one hour at a time
#[derive(Debug, Clone, Default)]
pub struct SimulationRunner {
    name: Option<String>,
    callbacks: SimulationCallbacks,
    cancel: Option<CancelFlag>,
    // Tripped by run_batch when a sibling job fails
    batch_cancel: Option<CancelFlag>,
}

impl SimulationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label used in logs and observer callbacks
    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_callbacks(mut self, callbacks: SimulationCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SimulationObserver>) -> Self {
        self.callbacks = self.callbacks.add_observer(observer);
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn with_batch_cancel(mut self, flag: CancelFlag) -> Self {
        self.batch_cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        [&self.cancel, &self.batch_cancel]
            .into_iter()
            .flatten()
            .any(CancelFlag::is_cancelled)
    }

    /// Reset `model` and step it once per forecast hour, in order.
    ///
    /// A cancelled run returns [`TwinError::Cancelled`] and no partial series.
    pub fn run<M>(&self, forecast: &ForecastSeries, model: &mut M) -> TwinResult<ResultSeries>
    where
        M: CapacityModel + ?Sized,
    {
        for row in forecast {
            let volume = row.hourly_adjusted_volume;
            if !volume.is_finite() || volume < 0.0 {
                return Err(TwinError::invalid_parameter(format!(
                    "Forecast volume at {} must be a finite non-negative number, got {}",
                    row.index, volume
                )));
            }
        }

        let context = RunContext {
            run_name: self.name.clone().unwrap_or_else(|| model.name().to_string()),
            model_type: model.name(),
            total_steps: forecast.len(),
        };

        model.reset();
        info!(
            "Starting simulation '{}' ({} model, {} hours)",
            context.run_name,
            context.model_type,
            forecast.len()
        );
        self.callbacks.run_started(&context);

        let mut rows = Vec::with_capacity(forecast.len());
        let mut numproc = model.numproc();
        let mut current_month = None;

        for (step, row) in forecast.iter().enumerate() {
            if self.is_cancelled() {
                warn!(
                    "Simulation '{}' cancelled after {} of {} steps",
                    context.run_name,
                    step,
                    forecast.len()
                );
                return Err(TwinError::Cancelled { completed_steps: step });
            }

            let index = row.index;
            if current_month != Some((index.year, index.month)) {
                current_month = Some((index.year, index.month));
                info!("Simulating year {} month {}/12", index.year, index.month);
                self.callbacks.month_started(&context, &index);
            }

            let metrics = model.step(row.hourly_adjusted_volume);

            if metrics.numproc != numproc {
                let event = ScaleEvent {
                    index,
                    direction: ScaleDirection::between(numproc, metrics.numproc),
                    from_numproc: numproc,
                    to_numproc: metrics.numproc,
                };
                debug!(
                    "Scaling {:?} at {}: {} -> {} units",
                    event.direction, index, event.from_numproc, event.to_numproc
                );
                self.callbacks.scaling(&context, &event);
                numproc = metrics.numproc;
            }

            rows.push(ResultRow::new(index, row.hourly_adjusted_volume, metrics));
        }

        let results = ResultSeries::new(rows);
        info!(
            "Finished simulation '{}': {} hours, total cost {:.2}",
            context.run_name,
            results.len(),
            results.total_cost()
        );
        self.callbacks.run_finished(&context, &results);
        Ok(results)
    }

    /// Run one job and summarize it
    pub fn run_job(&self, job: SimulationJob) -> TwinResult<SimulationOutcome> {
        let SimulationJob {
            name,
            forecast,
            mut model,
            sla,
        } = job;

        let runner = self.clone().named(name.clone());
        let results = runner.run(&forecast, &mut model)?;
        let summary = SimulationSummary::from_results(&results, &sla)?;

        Ok(SimulationOutcome {
            name,
            model: model.params(),
            results,
            summary,
        })
    }

    /// Run independent jobs concurrently on the blocking pool.
    ///
    /// Outcomes come back in job order. The first failing job cancels the
    /// others at their next hour and the batch returns its error once every
    /// worker has stopped. Cancellations caused by that failure are not
    /// reported in its place.
    pub async fn run_batch(&self, jobs: Vec<SimulationJob>) -> TwinResult<Vec<SimulationOutcome>> {
        info!("Running batch of {} simulations", jobs.len());

        let batch_cancel = CancelFlag::new();
        let handles = jobs.into_iter().map(|job| {
            let runner = self.clone().with_batch_cancel(batch_cancel.clone());
            let batch_cancel = batch_cancel.clone();
            let handle = tokio::task::spawn_blocking(move || runner.run_job(job));
            async move {
                let outcome = handle.await.map_err(TwinError::from).and_then(|outcome| outcome);
                if let Err(e) = &outcome {
                    if !batch_cancel.is_cancelled() {
                        warn!("Batch job failed, cancelling the remaining runs: {}", e);
                        batch_cancel.cancel();
                    }
                }
                outcome
            }
        });

        let mut outcomes = Vec::new();
        let mut failure: Option<TwinError> = None;
        for result in join_all(handles).await {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    let replace = match &failure {
                        None => true,
                        Some(TwinError::Cancelled { .. }) => !matches!(e, TwinError::Cancelled { .. }),
                        Some(_) => false,
                    };
                    if replace {
                        failure = Some(e);
                    }
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        debug!("Batch finished with {} outcomes", outcomes.len());
        Ok(outcomes)
    }

    /// Generate the forecast, build the model, run it and summarize
    pub fn execute(&self, config: &SimulationConfig) -> TwinResult<SimulationOutcome> {
        config.validate()?;
        let forecast = config.forecast.generate(config.from, config.to)?;
        let model = PipelineModel::from_params(config.model)?;

        let job = SimulationJob::new(config.name.clone(), Arc::new(forecast), model).with_sla(config.sla);
        self.run_job(job)
    }
}

/// One-call entry point for a configured what-if run
pub struct Simulation;

impl Simulation {
    pub fn execute(config: &SimulationConfig) -> TwinResult<SimulationOutcome> {
        SimulationRunner::new().execute(config)
    }

    /// Execute several configurations concurrently, results in input order
    pub async fn execute_all(configs: &[SimulationConfig]) -> TwinResult<Vec<SimulationOutcome>> {
        let mut jobs = Vec::with_capacity(configs.len());
        for config in configs {
            config.validate()?;
            let forecast = config.forecast.generate(config.from, config.to)?;
            let model = PipelineModel::from_params(config.model)?;
            jobs.push(SimulationJob::new(config.name.clone(), Arc::new(forecast), model).with_sla(config.sla));
        }
        SimulationRunner::new().run_batch(jobs).await
    }
}

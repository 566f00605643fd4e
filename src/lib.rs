//! # Pipetwin - Pipeline Capacity What-If Simulator
//!
//! Pipetwin is a deterministic digital twin for data pipelines. Given a synthetic
//! hourly traffic forecast and a capacity model, it simulates throughput, queue
//! backlog, latency, cost and autoscaling behaviour hour by hour, and checks the
//! result against a latency SLA.
//!
//! ## 🎯 Core Philosophy
//!
//! - **Deterministic**: the same forecast and parameters always give the same series
//! - **Typed Parameters**: every model is validated before it can run
//! - **Cheap What-Ifs**: runs are independent and can be batched concurrently
//! - **Bring Your Own Store**: persistence goes through a small async trait
//!
//! ## 📊 Architecture Overview
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────────────────────────────┐
//! │  ForecastParams  │     │               Capacity Models                │
//! │                  │     ├───────────┬──────────────┬───────────────────┤
//! │ • base volume    │     │  Fixed    │ QuickScaling │ Autoscaling (1h)  │
//! │ • yearly growth  │     │  1 unit   │ exact demand │ Autoscaling (1s)  │
//! │ • corrections    │     └───────────┴──────┬───────┴───────────────────┘
//! └────────┬─────────┘                        │ step(incoming)
//!          │ generate                         │
//!          ▼                                  ▼
//! ┌──────────────────┐   hourly volumes ┌──────────────────┐  ┌──────────────┐
//! │  ForecastSeries  │─────────────────▶│ SimulationRunner │─▶│  Observers   │
//! └──────────────────┘                  └────────┬─────────┘  └──────────────┘
//!                                                │ ResultSeries
//!                              ┌─────────────────┼─────────────────┐
//!                              ▼                 ▼                 ▼
//!                       ┌────────────┐   ┌──────────────┐   ┌────────────────┐
//!                       │ SLA check  │   │   Summary    │   │ TwinRepository │
//!                       └────────────┘   └──────────────┘   └────────────────┘
//! ```
//!
//! ## 🎛️ Usage Patterns
//!
//! ### One What-If Run
//! ```rust
//! use chrono::NaiveDate;
//! use pipetwin::{autoscaling_model, ForecastParams, Simulation, SimpleParams, SimulationConfig};
//!
//! # fn main() -> pipetwin::TwinResult<()> {
//! let pipeline = SimpleParams::new(5000.0, 0.9, 12.0, "fifo")?;
//! let config = SimulationConfig::builder()
//!     .name("checkout-january")
//!     .range(
//!         NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
//!     )
//!     .forecast(ForecastParams::new("checkout", 3500.0, 1.15))
//!     .model(autoscaling_model(0.0, pipeline)?)
//!     .build()?;
//!
//! let outcome = Simulation::execute(&config)?;
//! println!(
//!     "cost {:.2}, SLA met: {}",
//!     outcome.summary.total_cost, outcome.summary.sla_check.met
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ### Driving a Model Directly
//! Any [`CapacityModel`] can be stepped by hand or run over a hand-built
//! [`ForecastSeries`] with a [`SimulationRunner`].
//!
//! ## Features
//!
//! - **Four capacity models**: fixed, lag-free scaling, hourly and per-second hysteresis autoscaling
//! - **Forecasts**: monthly growth plus month and weekday/hour correction tables
//! - **SLA and summaries**: percent of hours under a FIFO latency limit, totals and maxima
//! - **Configuration**: builder, JSON and TOML (`config-toml` feature, on by default)
//! - **Observability**: `tracing` progress logs and [`SimulationObserver`] hooks
//! - **Cancellation**: [`CancelFlag`] aborts a run between two hours

pub mod callbacks;
pub mod codec;
pub mod config;
pub mod error;
pub mod forecast;
pub mod models;
pub mod persistence;
pub mod policies;
pub mod queue;
pub mod runner;
pub mod scaling;
pub mod sla;
pub mod summary;
pub mod tests;
pub mod types;
pub mod utils;

// Re-export common types for convenience
pub use types::{
    Cost, DayOfWeek, Policy, RecordCount, ResultRow, ResultSeries, ScaleDirection, ScaleEvent,
    Seconds, SlaResult, SlaSpec, StepMetrics, TimeIndex, SECONDS_PER_HOUR,
};

pub use error::{TwinError, TwinResult};

pub use forecast::{
    generate, hourly_timeline, ForecastParams, ForecastRow, ForecastSeries, HourlyCorrections,
    MonthlyCorrections,
};

pub use models::{
    AutoscalingFineModel, AutoscalingModel, AutoscalingParams, CapacityModel, FixedModel,
    ModelParams, PipelineModel, QuickScalingModel, QuickScalingParams, SimpleParams,
};

pub use codec::{JsonCodec, ModelCodec};

pub use callbacks::{RunContext, SimulationCallbacks, SimulationObserver};

pub use runner::{CancelFlag, Simulation, SimulationJob, SimulationOutcome, SimulationRunner};

pub use sla::{evaluate, evaluate_spec};

pub use summary::SimulationSummary;

pub use config::{SimulationConfig, SimulationConfigBuilder};

pub use persistence::{MemoryStore, TwinRepository, TwinStore};

pub use policies::{
    autoscaling_fine_model, autoscaling_model, calibrate_simple, quickscaling_model, simple_model,
};

// demos/basic_simulation.rs
//! Basic usage example showing a single what-if run
//!
//! This example demonstrates:
//! - Building a traffic forecast with seasonal corrections
//! - Simulating an autoscaling pipeline over a year
//! - Watching scaling events through an observer
//! - Storing the outputs in an in-memory store
//!
//! Run with: cargo run --example basic_simulation
//! More logs: RUST_LOG=pipetwin=debug cargo run --example basic_simulation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use pipetwin::{
    autoscaling_model, DayOfWeek, ForecastParams, HourlyCorrections, MemoryStore, MonthlyCorrections,
    PipelineModel, RunContext, ScaleDirection, ScaleEvent, SimpleParams, SimulationJob, SimulationObserver,
    SimulationRunner, SlaSpec, TwinError, TwinRepository, TwinResult,
};
use tracing_subscriber::EnvFilter;

/// Counts scale-ups and scale-downs as they happen
#[derive(Default)]
struct ScalingCounter {
    ups: AtomicUsize,
    downs: AtomicUsize,
}

impl SimulationObserver for ScalingCounter {
    fn on_scaling(&self, _context: &RunContext, event: &ScaleEvent) {
        match event.direction {
            ScaleDirection::Up => self.ups.fetch_add(1, Ordering::Relaxed),
            ScaleDirection::Down => self.downs.fetch_add(1, Ordering::Relaxed),
            ScaleDirection::Maintain => 0,
        };
    }
}

fn date(year: i32, month: u32, day: u32) -> TwinResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| TwinError::invalid_parameter(format!("{}-{}-{} is not a date", year, month, day)))
}

#[tokio::main]
async fn main() -> TwinResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pipetwin=info")))
        .init();

    println!("🚦 Pipeline what-if simulation");

    // Busier in December, quiet at night, evening peak on weekdays
    let mut hourly = HourlyCorrections::new();
    for hour in 0..6 {
        hourly.insert_every_day(hour, 0.3)?;
    }
    for day in [DayOfWeek::Mon, DayOfWeek::Tue, DayOfWeek::Wed, DayOfWeek::Thu, DayOfWeek::Fri] {
        hourly.insert(day, 19, 2.5)?;
        hourly.insert(day, 20, 2.0)?;
    }
    let traffic = ForecastParams::new("checkout", 3_000.0, 1.2)
        .with_monthly_corrections(MonthlyCorrections::new().with(11, 1.3)?.with(12, 1.7)?)
        .with_hourly_corrections(hourly);

    let from = date(2025, 1, 1)?;
    let to = date(2025, 12, 31)?;
    let forecast = Arc::new(traffic.generate(from, to)?);
    println!("📈 Forecast: {} hours, {:.0} records", forecast.len(), forecast.total_volume());

    let pipeline = SimpleParams::new(4_000.0, 0.85, 9.0, "fifo")?;
    let model = PipelineModel::from_params(autoscaling_model(0.2, pipeline)?)?;

    let counter = Arc::new(ScalingCounter::default());
    let runner = SimulationRunner::new().with_observer(counter.clone());
    let outcome = runner.run_job(SimulationJob::new("checkout-2025", forecast.clone(), model).with_sla(SlaSpec {
        latency_sla_limit: 60.0,
        latency_sla_percent: 99.0,
    }))?;

    let summary = &outcome.summary;
    println!("💰 Total cost:       {:.2}", summary.total_cost);
    println!("⏱️  Avg/max latency:  {:.1}s / {:.1}s", summary.avg_latency_s, summary.max_latency_s);
    println!("📦 Max queue:        {:.0} records", summary.max_queue);
    println!("🖥️  Max units:        {}", summary.max_numproc);
    println!(
        "⚖️  Scale ups/downs:  {} / {}",
        counter.ups.load(Ordering::Relaxed),
        counter.downs.load(Ordering::Relaxed)
    );
    println!(
        "✅ SLA {}: {:.2}% of hours under 60s",
        if summary.sla_check.met { "met" } else { "missed" },
        summary.sla_check.pct_time_within_limit
    );

    let store = Arc::new(MemoryStore::new());
    let repo = TwinRepository::new(store.clone());
    repo.save_forecast_params(&traffic).await?;
    repo.save_forecast(&traffic.model_name, &forecast).await?;
    repo.save_model("checkout", &outcome.model).await?;
    repo.save_simulation(&outcome).await?;

    println!("🗄️  Stored keys:");
    for key in store.keys().await {
        println!("   {}", key);
    }

    Ok(())
}

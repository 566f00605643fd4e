#[cfg(test)]
mod tests {
	use crate::config::*;
	use crate::error::*;
	use crate::forecast::*;
	use crate::models::*;
	use crate::policies::*;
	use crate::runner::*;
	use crate::types::*;
	use crate::utils::*;
	use chrono::NaiveDate;
	use std::sync::Arc;
	use tracing_subscriber::EnvFilter;

	fn init_tracing() {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::from_default_env())
			.with_test_writer()
			.try_init();
	}

	fn day(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	fn base(maxrate_rph: f64) -> SimpleParams {
		SimpleParams::new(maxrate_rph, 1.0, 5.0, "fifo").unwrap()
	}

	fn all_variants(maxrate_rph: f64) -> Vec<ModelParams> {
		vec![
			simple_model(maxrate_rph, 1.0, 5.0, "fifo").unwrap(),
			quickscaling_model(0.5, base(maxrate_rph)).unwrap(),
			autoscaling_model(0.5, base(maxrate_rph)).unwrap(),
			autoscaling_fine_model(0.5, base(maxrate_rph), 80.0, 600, 20.0, 600).unwrap(),
		]
	}

	#[test]
	fn test_autoscaling_preset_defaults() {
		let params = autoscaling_model(0.0, base(100.0)).unwrap();
		match params {
			ModelParams::Autoscaling(p) => {
				assert_eq!(p.up_pct_trigger, 80.0);
				assert_eq!(p.up_delay, 2);
				assert_eq!(p.down_pct_trigger, 20.0);
				assert_eq!(p.down_delay, 2);
			}
			other => panic!("unexpected preset {:?}", other),
		}
		assert!(simple_model(100.0, 1.0, 5.0, "stack").is_err());
	}

	#[test]
	fn test_calibrate_simple() {
		// 90000 records in half an hour for 2.5 units of cost
		let params = calibrate_simple(90_000.0, 1800.0, 2.5, 11.0, "lifo").unwrap();
		assert_eq!(params.maxrate_rph, 180_000.0);
		assert_eq!(params.per_vm_hourcost, 5.0);
		assert_eq!(params.policy, Policy::Lifo);

		assert!(matches!(
			calibrate_simple(100.0, 0.0, 1.0, 1.0, "fifo"),
			Err(TwinError::InvalidParameter { .. })
		));
		// No records means no measurable rate
		assert!(calibrate_simple(0.0, 60.0, 1.0, 1.0, "fifo").is_err());
	}

	#[test]
	fn test_invariants_hold_for_every_variant() {
		init_tracing();
		let pattern = [0.0, 50.0, 400.0, 1200.0, 90.0, 3000.0, 10.0, 0.0];
		let forecast = repeating_forecast(day(2025, 6, 1), 2, &pattern).unwrap();

		for params in all_variants(500.0) {
			let mut model = PipelineModel::from_params(params).unwrap();
			let results = SimulationRunner::new().run(&forecast, &mut model).unwrap();
			assert_eq!(results.len(), forecast.len());
			for row in &results {
				assert!(row.queue_len >= 0.0, "{} queue {}", params.model_type(), row.queue_len);
				assert!(row.numproc >= 1, "{} numproc {}", params.model_type(), row.numproc);
				assert!(row.throughput >= 0.0);
				assert!(row.latency_lifo >= 5.0);
			}
		}
	}

	#[test]
	fn test_fixed_conserves_records_with_ample_capacity() {
		let forecast = repeating_forecast(day(2025, 1, 1), 7, &[10.0, 4000.0, 250.5, 0.0]).unwrap();
		let mut model = FixedModel::new(base(1.0e9)).unwrap();
		let results = SimulationRunner::new().run(&forecast, &mut model).unwrap();

		assert!(results.iter().all(|r| r.queue_len == 0.0));
		assert_eq!(results.total_throughput(), results.total_incoming());
		assert_eq!(results.total_incoming(), forecast.total_volume());
	}

	#[test]
	fn test_fixed_backlog_grows_by_excess() {
		let forecast = constant_forecast(day(2025, 1, 1), 10, 200.0).unwrap();
		let mut model = FixedModel::new(base(100.0)).unwrap();
		let results = SimulationRunner::new().run(&forecast, &mut model).unwrap();

		for (hour, row) in results.iter().enumerate() {
			assert_eq!(row.queue_len, 100.0 * (hour + 1) as f64);
			assert_eq!(row.throughput, 100.0);
		}
		let last = results.rows().last().unwrap();
		assert_eq!(last.latency_lifo, 5.0 + 10.0 * 3600.0);
	}

	#[test]
	fn test_quickscaling_never_backlogs() {
		let pattern = [0.0, 1.0, 99.9, 100.0, 100.1, 12_345.6, 7.0];
		let forecast = repeating_forecast(day(2025, 1, 1), 3, &pattern).unwrap();
		let mut model = QuickScalingModel::new(QuickScalingParams {
			fixed_hourcost: 0.0,
			base: base(100.0),
		})
		.unwrap();
		let results = SimulationRunner::new().run(&forecast, &mut model).unwrap();

		assert!(results.iter().all(|r| r.queue_len == 0.0 && r.latency_fifo == 5.0));
		assert_eq!(results.rows()[5].numproc, 124);
	}

	#[test]
	fn test_autoscaling_lags_behind_demand() {
		let mut volumes = vec![50.0; 4];
		volumes.extend(vec![300.0; 8]);
		let forecast = ForecastSeries::from_volumes(day(2025, 1, 1), &volumes).unwrap();
		let mut model = PipelineModel::from_params(autoscaling_model(0.0, base(100.0)).unwrap()).unwrap();
		let results = SimulationRunner::new().run(&forecast, &mut model).unwrap();

		// Demand jumps at hour 4; a backlog builds before capacity catches up
		assert!(results.rows()[4].queue_len > 0.0);
		assert!(results.rows()[11].numproc > 1);
		assert!(results.iter().all(|r| r.numproc <= 12));
	}

	#[test]
	fn test_fine_and_hourly_reconcile() {
		let forecast = constant_forecast(day(2025, 1, 1), 6, 7200.0).unwrap();
		let base = SimpleParams::new(36_000.0, 2.0, 1.0, "fifo").unwrap();

		let mut hourly = PipelineModel::from_params(autoscaling_model(0.5, base).unwrap()).unwrap();
		let mut fine =
			PipelineModel::from_params(autoscaling_fine_model(0.5, base, 80.0, 7200, 20.0, 7200).unwrap())
				.unwrap();

		let runner = SimulationRunner::new();
		let hourly = runner.run(&forecast, &mut hourly).unwrap();
		let fine = runner.run(&forecast, &mut fine).unwrap();

		assert!(relative_difference(hourly.total_cost(), fine.total_cost()) < 0.01);
		assert!(relative_difference(hourly.total_throughput(), fine.total_throughput()) < 0.01);
		assert!(fine.iter().all(|r| r.numproc == 1));
	}

	fn hourly_and_fine(fixed_hourcost: f64, base: SimpleParams) -> (PipelineModel, PipelineModel) {
		let hourly = ModelParams::Autoscaling(AutoscalingParams {
			fixed_hourcost,
			up_pct_trigger: 80.0,
			up_delay: 1,
			down_pct_trigger: 20.0,
			down_delay: 2,
			base,
		});
		let fine = autoscaling_fine_model(fixed_hourcost, base, 80.0, 3600, 20.0, 7200).unwrap();
		(PipelineModel::from_params(hourly).unwrap(), PipelineModel::from_params(fine).unwrap())
	}

	#[test]
	fn test_fine_and_hourly_reconcile_under_backlog() {
		// 10000 records against 3600/h leaves a backlog either way
		let forecast = ForecastSeries::from_volumes(day(2025, 1, 1), &[10_000.0]).unwrap();
		let base = SimpleParams::new(3600.0, 2.0, 1.0, "fifo").unwrap();
		let (mut hourly, mut fine) = hourly_and_fine(0.5, base);

		let runner = SimulationRunner::new();
		let hourly = runner.run(&forecast, &mut hourly).unwrap();
		let fine = runner.run(&forecast, &mut fine).unwrap();

		assert_eq!(hourly.total_throughput(), 3600.0);
		assert!(relative_difference(hourly.total_throughput(), fine.total_throughput()) < 0.01);
		assert!(relative_difference(hourly.total_cost(), fine.total_cost()) < 0.01);
		assert_eq!(hourly.rows()[0].queue_len, 6400.0);
		assert!(relative_difference(hourly.rows()[0].queue_len, fine.rows()[0].queue_len) < 0.01);
		assert_eq!(hourly.rows()[0].numproc, 2);
		assert_eq!(fine.rows()[0].numproc, 2);
	}

	#[test]
	fn test_fine_and_hourly_reconcile_while_scaling() {
		let volumes = [7200.0, 7200.0, 7200.0, 0.0, 0.0, 500.0, 9000.0, 100.0];
		let forecast = ForecastSeries::from_volumes(day(2025, 1, 1), &volumes).unwrap();
		let base = SimpleParams::new(3600.0, 2.0, 1.0, "fifo").unwrap();
		let (mut hourly, mut fine) = hourly_and_fine(0.5, base);

		let runner = SimulationRunner::new();
		let hourly = runner.run(&forecast, &mut hourly).unwrap();
		let fine = runner.run(&forecast, &mut fine).unwrap();

		assert_eq!(hourly.total_throughput(), 31_200.0);
		assert!(relative_difference(hourly.total_throughput(), fine.total_throughput()) < 0.01);
		assert!(relative_difference(hourly.total_cost(), fine.total_cost()) < 0.01);

		// Both climb to 4 units, shed one during the idle hours, then climb back
		let units = |series: &ResultSeries| series.iter().map(|r| r.numproc).collect::<Vec<_>>();
		assert_eq!(units(&hourly), [2, 3, 4, 4, 3, 3, 4, 4]);
		assert_eq!(units(&fine), units(&hourly));
	}

	#[test]
	fn test_execute_end_to_end() {
		init_tracing();
		let config = SimulationConfig::builder()
			.name("january")
			.range(day(2025, 1, 1), day(2025, 1, 31))
			.forecast(
				ForecastParams::new("orders", 800.0, 1.2).with_hourly_corrections(
					HourlyCorrections::new().with(DayOfWeek::Fri, 18, 4.0).unwrap(),
				),
			)
			.model(autoscaling_model(0.0, base(1000.0)).unwrap())
			.sla(SlaSpec {
				latency_sla_limit: 60.0,
				latency_sla_percent: 95.0,
			})
			.build()
			.unwrap();

		let outcome = Simulation::execute(&config).unwrap();
		assert_eq!(outcome.results.len(), 31 * 24);
		assert_eq!(outcome.summary.hours, 31 * 24);
		assert_eq!(outcome.model, config.model);
		assert!(outcome.summary.total_cost > 0.0);
		assert!(outcome.summary.max_latency_s >= outcome.summary.avg_latency_s);
	}

	#[tokio::test]
	async fn test_execute_all_keeps_order() {
		let configs: Vec<SimulationConfig> = all_variants(2000.0)
			.into_iter()
			.map(|model| {
				SimulationConfig::builder()
					.range(day(2025, 3, 1), day(2025, 3, 2))
					.forecast(ForecastParams::new("orders", 1500.0, 1.0))
					.model(model)
					.build()
					.unwrap()
			})
			.collect();

		let outcomes = Simulation::execute_all(&configs).await.unwrap();
		let types: Vec<&str> = outcomes.iter().map(|o| o.model.model_type()).collect();
		assert_eq!(types, ModelParams::MODEL_TYPES);
		assert!(outcomes.iter().all(|o| o.results.len() == 48));
	}

	#[test]
	fn test_shared_forecast_across_jobs() {
		let forecast = Arc::new(constant_forecast(day(2025, 1, 1), 24, 100.0).unwrap());
		let jobs = vec![
			SimulationJob::new("a", forecast.clone(), PipelineModel::from_params(all_variants(50.0)[0]).unwrap()),
			SimulationJob::new("b", forecast.clone(), PipelineModel::from_params(all_variants(50.0)[1]).unwrap()),
		];
		let outcomes = tokio_test::block_on(SimulationRunner::new().run_batch(jobs)).unwrap();
		assert_eq!(Arc::strong_count(&forecast), 1);
		assert!(outcomes[0].summary.max_queue > 0.0);
		assert_eq!(outcomes[1].summary.max_queue, 0.0);
	}

	#[test]
	fn test_utils_functions() {
		assert_eq!(relative_difference(0.0, 0.0), 0.0);
		assert_eq!(relative_difference(100.0, 99.0), 0.01);
		assert_eq!(mean_and_max(vec![1.0, 3.0, 2.0]), Some((2.0, 3.0)));
		assert_eq!(mean_and_max(Vec::new()), None);
		let forecast = repeating_forecast(day(2025, 1, 1), 2, &[1.0, 2.0, 3.0]).unwrap();
		assert_eq!(forecast.volumes(), vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
	}
}

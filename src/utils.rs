//! Utility functions for common operations

use chrono::NaiveDate;

use crate::error::TwinResult;
use crate::forecast::ForecastSeries;
use crate::types::RecordCount;

/// Forecast with the same volume every hour, starting at `start` 00:00
pub fn constant_forecast(start: NaiveDate, hours: usize, volume: RecordCount) -> TwinResult<ForecastSeries> {
    ForecastSeries::from_volumes(start, &vec![volume; hours])
}

/// Forecast that repeats `pattern` (typically 24 hourly volumes) for `days` days
pub fn repeating_forecast(start: NaiveDate, days: usize, pattern: &[RecordCount]) -> TwinResult<ForecastSeries> {
    let volumes: Vec<RecordCount> = pattern.iter().copied().cycle().take(pattern.len() * days).collect();
    ForecastSeries::from_volumes(start, &volumes)
}

/// `|a - b|` relative to the larger magnitude, 0.0 when both are zero
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

/// Mean and maximum of a sequence, `None` when it is empty
pub fn mean_and_max<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
{
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        count += 1;
        sum += value;
        max = max.max(value);
    }
    (count > 0).then(|| (sum / count as f64, max))
}

//! # Traffic Forecast Generation
//!
//! Builds an hourly traffic-volume series over a date range by applying a
//! monthly growth factor and two multiplicative correction tables to a constant
//! base volume:
//!
//! ```text
//! monthly_adjusted = base * monthly[month] * yearly_growth ^ (1/12)
//! hourly_adjusted  = monthly_adjusted * hourly[(day_of_week, hour)]
//! ```
//!
//! Keys missing from a correction table leave the volume unchanged (factor 1.0).
//! Fitting the correction factors from observed history is not done here; the
//! tables are inputs.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ensure_non_negative, ensure_positive, TwinError, TwinResult};
use crate::types::{DayOfWeek, RecordCount, TimeIndex};

/// Multiplicative correction per calendar month (1-12)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MonthlyFactor>", into = "Vec<MonthlyFactor>")]
pub struct MonthlyCorrections {
    factors: BTreeMap<u32, f64>,
}

/// Serialized form of one monthly correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFactor {
    pub month: u32,
    pub factor: f64,
}

impl MonthlyCorrections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, month: u32, factor: f64) -> TwinResult<Self> {
        self.insert(month, factor)?;
        Ok(self)
    }

    pub fn insert(&mut self, month: u32, factor: f64) -> TwinResult<()> {
        if !(1..=12).contains(&month) {
            return Err(TwinError::invalid_parameter(format!(
                "Monthly correction key must be 1-12, got {}",
                month
            )));
        }
        ensure_positive("monthly correction factor", factor)?;
        self.factors.insert(month, factor);
        Ok(())
    }

    /// Factor for `month`, 1.0 when no correction is defined
    pub fn factor(&self, month: u32) -> f64 {
        self.factors.get(&month).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl TryFrom<Vec<MonthlyFactor>> for MonthlyCorrections {
    type Error = TwinError;

    fn try_from(entries: Vec<MonthlyFactor>) -> TwinResult<Self> {
        let mut table = MonthlyCorrections::new();
        for entry in entries {
            table.insert(entry.month, entry.factor)?;
        }
        Ok(table)
    }
}

impl From<MonthlyCorrections> for Vec<MonthlyFactor> {
    fn from(table: MonthlyCorrections) -> Self {
        table
            .factors
            .into_iter()
            .map(|(month, factor)| MonthlyFactor { month, factor })
            .collect()
    }
}

/// Multiplicative correction per (day of week, hour of day)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<HourlyFactor>", into = "Vec<HourlyFactor>")]
pub struct HourlyCorrections {
    factors: BTreeMap<(DayOfWeek, u32), f64>,
}

/// Serialized form of one hourly correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyFactor {
    pub day_of_week: DayOfWeek,
    pub hour: u32,
    pub factor: f64,
}

impl HourlyCorrections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, day: DayOfWeek, hour: u32, factor: f64) -> TwinResult<Self> {
        self.insert(day, hour, factor)?;
        Ok(self)
    }

    pub fn insert(&mut self, day: DayOfWeek, hour: u32, factor: f64) -> TwinResult<()> {
        if hour > 23 {
            return Err(TwinError::invalid_parameter(format!(
                "Hourly correction hour must be 0-23, got {}",
                hour
            )));
        }
        ensure_positive("hourly correction factor", factor)?;
        self.factors.insert((day, hour), factor);
        Ok(())
    }

    /// Apply the same factor to `hour` on every day of the week
    pub fn insert_every_day(&mut self, hour: u32, factor: f64) -> TwinResult<()> {
        for day in DayOfWeek::ALL {
            self.insert(day, hour, factor)?;
        }
        Ok(())
    }

    /// Factor for the slot, 1.0 when no correction is defined
    pub fn factor(&self, day: DayOfWeek, hour: u32) -> f64 {
        self.factors.get(&(day, hour)).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl TryFrom<Vec<HourlyFactor>> for HourlyCorrections {
    type Error = TwinError;

    fn try_from(entries: Vec<HourlyFactor>) -> TwinResult<Self> {
        let mut table = HourlyCorrections::new();
        for entry in entries {
            table.insert(entry.day_of_week, entry.hour, entry.factor)?;
        }
        Ok(table)
    }
}

impl From<HourlyCorrections> for Vec<HourlyFactor> {
    fn from(table: HourlyCorrections) -> Self {
        table
            .factors
            .into_iter()
            .map(|((day_of_week, hour), factor)| HourlyFactor {
                day_of_week,
                hour,
                factor,
            })
            .collect()
    }
}

/// One forecast hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub index: TimeIndex,
    pub base_volume: RecordCount,
    pub monthly_adjusted_volume: RecordCount,
    pub hourly_adjusted_volume: RecordCount,
}

/// Ordered hourly forecast with an index from `TimeIndex` to row position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ForecastRow>", into = "Vec<ForecastRow>")]
pub struct ForecastSeries {
    rows: Vec<ForecastRow>,
    positions: HashMap<TimeIndex, usize>,
}

impl ForecastSeries {
    fn from_ordered_rows(rows: Vec<ForecastRow>) -> Self {
        let positions = rows
            .iter()
            .enumerate()
            .map(|(pos, row)| (row.index, pos))
            .collect();
        Self { rows, positions }
    }

    /// Build a series directly from hourly volumes starting at `start` 00:00.
    ///
    /// No corrections are applied; every volume column holds the given value.
    pub fn from_volumes(start: NaiveDate, volumes: &[RecordCount]) -> TwinResult<Self> {
        let mut rows = Vec::with_capacity(volumes.len());
        for (offset, &volume) in volumes.iter().enumerate() {
            ensure_non_negative("forecast volume", volume)?;
            let date = start
                .checked_add_days(Days::new((offset / 24) as u64))
                .ok_or_else(|| TwinError::invalid_parameter("Forecast runs past the end of the calendar"))?;
            rows.push(ForecastRow {
                index: time_index(date, (offset % 24) as u32),
                base_volume: volume,
                monthly_adjusted_volume: volume,
                hourly_adjusted_volume: volume,
            });
        }
        Ok(Self::from_ordered_rows(rows))
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row position of an hour, if it is inside the horizon
    pub fn position(&self, index: &TimeIndex) -> Option<usize> {
        self.positions.get(index).copied()
    }

    pub fn get(&self, index: &TimeIndex) -> Option<&ForecastRow> {
        self.position(index).map(|pos| &self.rows[pos])
    }

    /// Hourly-adjusted volumes in chronological order
    pub fn volumes(&self) -> Vec<RecordCount> {
        self.rows.iter().map(|r| r.hourly_adjusted_volume).collect()
    }

    pub fn total_volume(&self) -> RecordCount {
        self.rows.iter().map(|r| r.hourly_adjusted_volume).sum()
    }
}

impl TryFrom<Vec<ForecastRow>> for ForecastSeries {
    type Error = TwinError;

    fn try_from(rows: Vec<ForecastRow>) -> TwinResult<Self> {
        let mut previous: Option<TimeIndex> = None;
        for row in &rows {
            check_slot(&row.index)?;
            if let Some(prev) = previous {
                let expected = next_hour(&prev)?;
                if row.index != expected {
                    return Err(TwinError::invalid_parameter(format!(
                        "Forecast rows must be consecutive hours: {} is followed by {}, expected {}",
                        prev, row.index, expected
                    )));
                }
            }
            ensure_non_negative("forecast volume", row.hourly_adjusted_volume)?;
            previous = Some(row.index);
        }
        Ok(Self::from_ordered_rows(rows))
    }
}

impl From<ForecastSeries> for Vec<ForecastRow> {
    fn from(series: ForecastSeries) -> Self {
        series.rows
    }
}

impl<'a> IntoIterator for &'a ForecastSeries {
    type Item = &'a ForecastRow;
    type IntoIter = std::slice::Iter<'a, ForecastRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn time_index(date: NaiveDate, hour: u32) -> TimeIndex {
    TimeIndex {
        year: date.year(),
        month: date.month(),
        day: date.day(),
        day_of_week: date.weekday().into(),
        hour,
    }
}

/// Calendar date of a slot, rejecting impossible dates, hours past 23 and a
/// weekday that does not belong to the date
fn check_slot(index: &TimeIndex) -> TwinResult<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(index.year, index.month, index.day).ok_or_else(|| {
        TwinError::invalid_parameter(format!(
            "Forecast slot {}-{:02}-{:02} is not a calendar date",
            index.year, index.month, index.day
        ))
    })?;
    if index.hour > 23 {
        return Err(TwinError::invalid_parameter(format!(
            "Forecast slot {} has hour {} outside 0-23",
            date, index.hour
        )));
    }
    let weekday = DayOfWeek::from(date.weekday());
    if index.day_of_week != weekday {
        return Err(TwinError::invalid_parameter(format!(
            "Forecast slot {} is labelled {} but falls on {}",
            date,
            index.day_of_week.abbrev(),
            weekday.abbrev()
        )));
    }
    Ok(date)
}

fn next_hour(index: &TimeIndex) -> TwinResult<TimeIndex> {
    let date = check_slot(index)?;
    if index.hour < 23 {
        return Ok(time_index(date, index.hour + 1));
    }
    date.succ_opt()
        .map(|next| time_index(next, 0))
        .ok_or_else(|| TwinError::invalid_parameter("Forecast runs past the end of the calendar"))
}

/// Every hour from `from` 00:00 through `to` 23:00
///
/// The last day is covered in full, so a calendar year yields 8760 slots
/// (8784 in a leap year). A range that stopped at `to` 00:00 would be 23 hours
/// shorter.
pub fn hourly_timeline(from: NaiveDate, to: NaiveDate) -> TwinResult<Vec<TimeIndex>> {
    if to < from {
        return Err(TwinError::invalid_range(from, to));
    }

    let days = (to - from).num_days() as usize + 1;
    let mut timeline = Vec::with_capacity(days * 24);
    let mut date = Some(from);
    while let Some(day) = date.filter(|d| *d <= to) {
        for hour in 0..24 {
            timeline.push(time_index(day, hour));
        }
        date = day.succ_opt();
    }
    Ok(timeline)
}

/// Generate the hourly forecast for `[from, to]` (both days inclusive)
///
/// Rows run from `from` 00:00 to `to` 23:00. For 2025-01-01 .. 2025-12-31 that
/// is 8760 rows; an hourly range ending at `to` 00:00 would give 8737, so
/// results compared against such a horizon carry 23 extra hours at the end.
pub fn generate(
    from: NaiveDate,
    to: NaiveDate,
    base_volume: RecordCount,
    yearly_growth_rate: f64,
    monthly_corrections: &MonthlyCorrections,
    hourly_corrections: &HourlyCorrections,
) -> TwinResult<ForecastSeries> {
    ensure_non_negative("base_volume", base_volume)?;
    ensure_non_negative("yearly_growth_rate", yearly_growth_rate)?;

    let timeline = hourly_timeline(from, to)?;
    let monthly_growth_factor = yearly_growth_rate.powf(1.0 / 12.0);

    let rows: Vec<ForecastRow> = timeline
        .into_iter()
        .map(|index| {
            let monthly_adjusted_volume =
                base_volume * monthly_corrections.factor(index.month) * monthly_growth_factor;
            let hourly_adjusted_volume =
                monthly_adjusted_volume * hourly_corrections.factor(index.day_of_week, index.hour);
            ForecastRow {
                index,
                base_volume,
                monthly_adjusted_volume,
                hourly_adjusted_volume,
            }
        })
        .collect();

    debug!(
        "Generated forecast {} .. {}: {} hours, growth factor {:.6}/month",
        from,
        to,
        rows.len(),
        monthly_growth_factor
    );

    Ok(ForecastSeries::from_ordered_rows(rows))
}

/// Parameter set of a traffic model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastParams {
    /// Name the model is stored under
    pub model_name: String,
    /// Records per hour before any correction
    pub base_volume: RecordCount,
    /// Yearly growth multiplier (1.10 = 10% growth per year)
    pub yearly_growth_rate: f64,
    #[serde(default)]
    pub monthly_corrections: MonthlyCorrections,
    #[serde(default)]
    pub hourly_corrections: HourlyCorrections,
}

impl ForecastParams {
    pub fn new<S: Into<String>>(model_name: S, base_volume: RecordCount, yearly_growth_rate: f64) -> Self {
        Self {
            model_name: model_name.into(),
            base_volume,
            yearly_growth_rate,
            monthly_corrections: MonthlyCorrections::new(),
            hourly_corrections: HourlyCorrections::new(),
        }
    }

    pub fn with_monthly_corrections(mut self, corrections: MonthlyCorrections) -> Self {
        self.monthly_corrections = corrections;
        self
    }

    pub fn with_hourly_corrections(mut self, corrections: HourlyCorrections) -> Self {
        self.hourly_corrections = corrections;
        self
    }

    pub fn validate(&self) -> TwinResult<()> {
        ensure_non_negative("base_volume", self.base_volume)?;
        ensure_non_negative("yearly_growth_rate", self.yearly_growth_rate)
    }

    pub fn generate(&self, from: NaiveDate, to: NaiveDate) -> TwinResult<ForecastSeries> {
        generate(
            from,
            to,
            self.base_volume,
            self.yearly_growth_rate,
            &self.monthly_corrections,
            &self.hourly_corrections,
        )
    }
}

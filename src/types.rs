// src/types.rs

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{TwinError, TwinResult};

/// Number of records (fractional volumes are allowed in the hourly models)
pub type RecordCount = f64;

/// Money per simulated time-step, in whatever currency the hourcosts use
pub type Cost = f64;

/// Latency or age in seconds
pub type Seconds = f64;

/// Seconds in one hourly time-step
pub const SECONDS_PER_HOUR: u32 = 3600;

/// Queueing discipline a pipeline is declared with.
///
/// Only validated; both FIFO and LIFO latencies are always reported regardless
/// of the declared policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    #[default]
    Fifo,
    Lifo,
    Random,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Fifo => "fifo",
            Policy::Lifo => "lifo",
            Policy::Random => "random",
        }
    }
}

impl FromStr for Policy {
    type Err = TwinError;

    fn from_str(s: &str) -> TwinResult<Self> {
        match s {
            "fifo" => Ok(Policy::Fifo),
            "lifo" => Ok(Policy::Lifo),
            "random" => Ok(Policy::Random),
            other => Err(TwinError::invalid_policy(other)),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day of week, serialized as the upper-case three letter abbreviation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    pub fn abbrev(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "MON",
            DayOfWeek::Tue => "TUE",
            DayOfWeek::Wed => "WED",
            DayOfWeek::Thu => "THU",
            DayOfWeek::Fri => "FRI",
            DayOfWeek::Sat => "SAT",
            DayOfWeek::Sun => "SUN",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = TwinError;

    fn from_str(s: &str) -> TwinResult<Self> {
        DayOfWeek::ALL
            .iter()
            .copied()
            .find(|d| d.abbrev().eq_ignore_ascii_case(s))
            .ok_or_else(|| TwinError::invalid_parameter(format!("Unknown day of week '{}'", s)))
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// One hourly slot of the forecast horizon.
///
/// Field order matches the sort order; `day_of_week` is derived from the date
/// so it never changes the ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeIndex {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub day_of_week: DayOfWeek,
    pub hour: u32,
}

impl fmt::Display for TimeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {} {:02}:00",
            self.year, self.month, self.day, self.day_of_week, self.hour
        )
    }
}

/// Metrics reported by a capacity model for one time-step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StepMetrics {
    /// Records processed during the step
    pub throughput: RecordCount,
    /// Base latency plus the time to drain the queue found at the start of the step
    pub latency_fifo: Seconds,
    /// Base latency plus the age of the oldest queued record
    pub latency_lifo: Seconds,
    /// Backlog carried into the next step
    pub queue: RecordCount,
    /// Cost incurred during the step
    pub cost: Cost,
    /// Active processing units at the end of the step
    pub numproc: u32,
}

/// Direction of a scaling action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScaleDirection {
    /// Scale up (add processing units)
    Up,
    /// Scale down (remove processing units)
    Down,
    /// Keep current scale
    Maintain,
}

impl ScaleDirection {
    pub fn between(before: u32, after: u32) -> Self {
        match after.cmp(&before) {
            std::cmp::Ordering::Greater => ScaleDirection::Up,
            std::cmp::Ordering::Less => ScaleDirection::Down,
            std::cmp::Ordering::Equal => ScaleDirection::Maintain,
        }
    }
}

/// A change of `numproc` observed while running a simulation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScaleEvent {
    /// Hour in which the change happened
    pub index: TimeIndex,
    pub direction: ScaleDirection,
    pub from_numproc: u32,
    pub to_numproc: u32,
}

/// Simulation output for one forecast hour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRow {
    pub index: TimeIndex,
    /// Records that arrived during the hour
    pub incoming: RecordCount,
    pub throughput: RecordCount,
    pub queue_len: RecordCount,
    pub latency_fifo: Seconds,
    pub latency_lifo: Seconds,
    /// `cost / throughput`; absent for hours that processed nothing
    pub cost_per_record: Option<Cost>,
    pub cost: Cost,
    pub numproc: u32,
}

impl ResultRow {
    pub fn new(index: TimeIndex, incoming: RecordCount, metrics: StepMetrics) -> Self {
        let cost_per_record = if metrics.throughput > 0.0 {
            Some(metrics.cost / metrics.throughput)
        } else {
            None
        };

        Self {
            index,
            incoming,
            throughput: metrics.throughput,
            queue_len: metrics.queue,
            latency_fifo: metrics.latency_fifo,
            latency_lifo: metrics.latency_lifo,
            cost_per_record,
            cost: metrics.cost,
            numproc: metrics.numproc,
        }
    }
}

/// Ordered simulation output, one row per forecast hour
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSeries {
    rows: Vec<ResultRow>,
}

impl ResultSeries {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_incoming(&self) -> RecordCount {
        self.rows.iter().map(|r| r.incoming).sum()
    }

    pub fn total_throughput(&self) -> RecordCount {
        self.rows.iter().map(|r| r.throughput).sum()
    }

    pub fn total_cost(&self) -> Cost {
        self.rows.iter().map(|r| r.cost).sum()
    }

    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a ResultSeries {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Latency service-level agreement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SlaSpec {
    /// FIFO latency (seconds) each hour must stay under
    pub latency_sla_limit: Seconds,
    /// Percentage of hours that must stay under the limit
    pub latency_sla_percent: f64,
}

impl Default for SlaSpec {
    fn default() -> Self {
        Self {
            latency_sla_limit: 70.0,
            latency_sla_percent: 99.0,
        }
    }
}

/// Outcome of an SLA check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SlaResult {
    pub met: bool,
    pub pct_time_within_limit: f64,
}

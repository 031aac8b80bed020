//! Year-over-year trend of one weather variable across the sampled window.
//!
//! Operates on the filtered table, so each year's value is the mean over the
//! same ±3-day window used for the risk figures.

use crate::analysis::risk::mean;
use crate::model::DailyRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Width of the centered moving average, in years.
pub const MOVING_AVERAGE_YEARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendVariable {
    Temperature,
    TempMax,
    TempMin,
    Precipitation,
    WindSpeed,
    Humidity,
}

impl TrendVariable {
    pub const ALL: [TrendVariable; 6] = [
        TrendVariable::Temperature,
        TrendVariable::TempMax,
        TrendVariable::TempMin,
        TrendVariable::Precipitation,
        TrendVariable::WindSpeed,
        TrendVariable::Humidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendVariable::Temperature => "temperature",
            TrendVariable::TempMax => "temp_max",
            TrendVariable::TempMin => "temp_min",
            TrendVariable::Precipitation => "precipitation",
            TrendVariable::WindSpeed => "wind_speed",
            TrendVariable::Humidity => "humidity",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            TrendVariable::Temperature | TrendVariable::TempMax | TrendVariable::TempMin => "°C",
            TrendVariable::Precipitation => "mm",
            TrendVariable::WindSpeed => "m/s",
            TrendVariable::Humidity => "%",
        }
    }

    /// The record's value for this variable, if present.
    pub fn value(&self, record: &DailyRecord) -> Option<f64> {
        match self {
            TrendVariable::Temperature => Some(record.temperature),
            TrendVariable::TempMax => Some(record.temp_max),
            TrendVariable::TempMin => Some(record.temp_min),
            TrendVariable::Precipitation => Some(record.precipitation),
            TrendVariable::WindSpeed => Some(record.wind_speed),
            TrendVariable::Humidity => record.humidity,
        }
    }
}

impl fmt::Display for TrendVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trend variable '{0}' (expected one of: {names})", names = variable_names())]
pub struct UnknownTrendVariable(pub String);

fn variable_names() -> String {
    let names: Vec<&str> = TrendVariable::ALL.iter().map(|v| v.as_str()).collect();
    names.join(", ")
}

impl FromStr for TrendVariable {
    type Err = UnknownTrendVariable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TrendVariable::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| UnknownTrendVariable(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub mean: f64,
    /// Centered 3-year average; `None` at either end of the series.
    pub moving_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyTrend {
    pub variable: TrendVariable,
    pub points: Vec<YearPoint>,
    /// Least-squares slope in units per year; needs more than two years.
    pub slope_per_year: Option<f64>,
}

/// Per-year means of `variable`, ascending by year. Years without any value
/// for the variable are omitted.
pub fn yearly_means(table: &[DailyRecord], variable: TrendVariable) -> Vec<(i32, f64)> {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for record in table {
        if let Some(v) = variable.value(record) {
            by_year.entry(record.year).or_default().push(v);
        }
    }
    by_year.into_iter().map(|(year, values)| (year, mean(&values))).collect()
}

/// Ordinary least-squares slope of `y` on `x`.
pub fn linear_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (num, den) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
        let dx = x - mean_x;
        (num + dx * (y - mean_y), den + dx * dx)
    });
    (den > 0.0).then(|| num / den)
}

/// Centered moving average of width [`MOVING_AVERAGE_YEARS`].
pub fn centered_moving_average(values: &[f64]) -> Vec<Option<f64>> {
    let half = MOVING_AVERAGE_YEARS / 2;
    if values.len() < MOVING_AVERAGE_YEARS {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            (i >= half && i + half < values.len()).then(|| mean(&values[i - half..=i + half]))
        })
        .collect()
}

/// Builds the full trend for `variable` over `table`.
pub fn yearly_trend(table: &[DailyRecord], variable: TrendVariable) -> YearlyTrend {
    let means = yearly_means(table, variable);
    let values: Vec<f64> = means.iter().map(|(_, m)| *m).collect();
    let moving = centered_moving_average(&values);

    let slope_per_year = if means.len() > 2 {
        let xy: Vec<(f64, f64)> = means.iter().map(|(y, m)| (*y as f64, *m)).collect();
        linear_slope(&xy)
    } else {
        None
    };

    YearlyTrend {
        variable,
        points: means
            .iter()
            .zip(moving)
            .map(|((year, mean), moving_average)| YearPoint {
                year: *year,
                mean: *mean,
                moving_average,
            })
            .collect(),
        slope_per_year,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

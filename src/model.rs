/// DailyRecord, ActivityThresholds, and the error enums shared by the
/// ingest, analysis, and export layers.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O; the only logic is input validation and the sentinel
/// check, both of which are fundamental to what counts as a valid record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// POWER parameter codes
// ---------------------------------------------------------------------------

/// Mean daily air temperature at 2 m, °C.
pub const PARAM_TEMP_MEAN: &str = "T2M";
/// Maximum daily air temperature at 2 m, °C.
pub const PARAM_TEMP_MAX: &str = "T2M_MAX";
/// Minimum daily air temperature at 2 m, °C.
pub const PARAM_TEMP_MIN: &str = "T2M_MIN";
/// Bias-corrected total precipitation, mm/day.
pub const PARAM_PRECIP: &str = "PRECTOTCORR";
/// Mean daily wind speed at 2 m, m/s.
pub const PARAM_WIND: &str = "WS2M";
/// Relative humidity at 2 m, %.
pub const PARAM_HUMIDITY: &str = "RH2M";
/// Cloud amount, %.
pub const PARAM_CLOUD: &str = "CLOUD_AMT";
/// Surface pressure, kPa.
pub const PARAM_PRESSURE: &str = "PS";

/// Every record must carry all of these.
pub const CORE_PARAMETERS: [&str; 5] = [
    PARAM_TEMP_MEAN,
    PARAM_TEMP_MAX,
    PARAM_TEMP_MIN,
    PARAM_PRECIP,
    PARAM_WIND,
];

/// Requested alongside the core set; absence never drops a day.
pub const OPTIONAL_PARAMETERS: [&str; 3] = [PARAM_HUMIDITY, PARAM_CLOUD, PARAM_PRESSURE];

/// The provider's "no data" placeholder.
pub const MISSING_SENTINEL: f64 = -999.0;

/// Returns the value only if it is present and not the sentinel.
pub fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != MISSING_SENTINEL)
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One validated daily observation for a single calendar day in a single
/// historical year.
///
/// `month` and `day` duplicate `date` so the aggregator can filter without
/// re-deriving them. Records are built once by the ingest layer and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub year: i32,
    pub date: NaiveDate,
    pub month: u32,
    pub day: u32,
    pub temperature: f64,   // °C, mean
    pub temp_max: f64,      // °C
    pub temp_min: f64,      // °C
    pub precipitation: f64, // mm
    pub wind_speed: f64,    // m/s at 2 m
    pub humidity: Option<f64>,    // %
    pub cloud_cover: Option<f64>, // %
    pub heat_index: Option<f64>,  // °C, only when temperature >= 27
    pub pressure: Option<f64>,    // kPa
}

/// Threshold quadruple deciding whether a day is unfavorable for an activity.
///
/// Direction of each comparison:
///   too cold:  temp_min <  thresholds.temp_min
///   too hot:   temp_max >  thresholds.temp_max
///   rainy:     precipitation >= thresholds.rain
///   windy:     wind_speed    >= thresholds.wind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityThresholds {
    pub temp_min: f64,
    pub temp_max: f64,
    pub rain: f64,
    pub wind: f64,
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Default lookback window, in years.
pub const DEFAULT_YEARS_BACK: u32 = 15;

/// A validated (location, calendar day, lookback) fetch request.
///
/// Construct through [`FetchRequest::new`]; the fields are read-only so an
/// instance is always in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchRequest {
    latitude: f64,
    longitude: f64,
    month: u32,
    day: u32,
    years_back: u32,
}

impl FetchRequest {
    pub fn new(
        latitude: f64,
        longitude: f64,
        month: u32,
        day: u32,
        years_back: u32,
    ) -> Result<Self, RequestError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RequestError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(RequestError::LongitudeOutOfRange(longitude));
        }
        if !(1..=12).contains(&month) {
            return Err(RequestError::InvalidMonth(month));
        }
        // 2000 is a leap year, so Feb 29 is accepted here and resolved per
        // year by the ingest window.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(RequestError::InvalidDay { month, day });
        }
        if years_back == 0 {
            return Err(RequestError::ZeroYearsBack);
        }
        Ok(Self {
            latitude,
            longitude,
            month,
            day,
            years_back,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn years_back(&self) -> u32 {
        self.years_back
    }

    /// Short label used as logging context, e.g. `40.7128,-74.0060@07-15`.
    pub fn label(&self) -> String {
        format!(
            "{:.4},{:.4}@{:02}-{:02}",
            self.latitude, self.longitude, self.month, self.day
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Rejected request parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("month {0} is outside [1, 12]")]
    InvalidMonth(u32),
    #[error("day {day} is not valid for month {month}")]
    InvalidDay { month: u32, day: u32 },
    #[error("years_back must be at least 1")]
    ZeroYearsBack,
}

/// Reasons a single year's fetch was skipped.
///
/// These never escape the fetch as a whole; they are collected into the
/// per-year outcome list and logged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PowerError {
    /// Non-2xx HTTP response from the POWER API.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection-level failure (DNS, TLS, reset).
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The response lacked `properties.parameter` or a required series.
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    /// A per-day key was not a `YYYYMMDD` date.
    #[error("invalid date key: {0}")]
    InvalidDateKey(String),
    /// The target month/day does not exist in this year (other than Feb 29).
    #[error("no calendar date {month:02}-{day:02} in {year}")]
    InvalidCenterDate { year: i32, month: u32, day: u32 },
}

impl From<reqwest::Error> for PowerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PowerError::Timeout
        } else if let Some(status) = err.status() {
            PowerError::Http(status.as_u16())
        } else if err.is_decode() {
            PowerError::Parse(err.to_string())
        } else {
            PowerError::Transport(err.to_string())
        }
    }
}

/// Request-level failures surfaced to the user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),
    /// Zero usable records across every year.
    #[error("no historical data available for this location")]
    EmptyDataset,
    /// The ±3-day window held too few records for statistics.
    #[error("insufficient data: {found} days in window, need {required}; try a different date")]
    InsufficientSample { found: usize, required: usize },
}

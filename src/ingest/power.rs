/// NASA POWER Daily Point API Client
///
/// Retrieves satellite-derived daily meteorology for a single coordinate
/// from the NASA Prediction Of Worldwide Energy Resources service, and turns
/// a response into validated `DailyRecord`s.
///
/// API Documentation: https://power.larc.nasa.gov/docs/services/api/temporal/daily/
/// Example: https://power.larc.nasa.gov/api/temporal/daily/point?parameters=T2M&community=RE&longitude=-89.6&latitude=40.7&start=20200710&end=20200720&format=JSON

use crate::model::{
    CORE_PARAMETERS, DailyRecord, OPTIONAL_PARAMETERS, PARAM_CLOUD, PARAM_HUMIDITY, PARAM_PRECIP,
    PARAM_PRESSURE, PARAM_TEMP_MAX, PARAM_TEMP_MEAN, PARAM_TEMP_MIN, PARAM_WIND, PowerError, usable,
};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

pub const POWER_BASE_URL: &str = "https://power.larc.nasa.gov";

/// POWER "community" selects unit conventions; RE (renewable energy) reports
/// °C, mm/day and m/s.
pub const DEFAULT_COMMUNITY: &str = "RE";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Heat index is only meaningful in warm conditions.
pub const HEAT_INDEX_MIN_TEMP_C: f64 = 27.0;

// ============================================================================
// POWER API Response Structures
// ============================================================================

/// Top-level daily point response. Only the parameter block is used.
#[derive(Debug, Deserialize)]
pub struct PowerDailyResponse {
    pub properties: Option<PowerProperties>,
}

#[derive(Debug, Deserialize)]
pub struct PowerProperties {
    /// Variable name → (`YYYYMMDD` → value). `null` and `-999` both mean
    /// missing.
    pub parameter: Option<HashMap<String, BTreeMap<String, Option<f64>>>>,
}

/// Outcome of parsing one year's response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWindow {
    pub records: Vec<DailyRecord>,
    /// Days present in the response but dropped for a missing core value.
    pub dropped_days: usize,
}

// ============================================================================
// Data source seam
// ============================================================================

/// Anything that can answer a daily point query for an inclusive date range.
///
/// The HTTP client implements this; tests substitute canned responses.
pub trait DailySource {
    fn fetch_daily(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PowerDailyResponse, PowerError>;
}

/// Blocking HTTP client for the POWER daily point endpoint.
pub struct PowerClient {
    client: reqwest::blocking::Client,
    base_url: String,
    community: String,
}

impl PowerClient {
    /// Client against the public endpoint with the default 30 s timeout.
    pub fn new() -> Result<Self, PowerError> {
        Self::with_settings(POWER_BASE_URL, DEFAULT_COMMUNITY, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_settings(base_url: &str, community: &str, timeout: Duration) -> Result<Self, PowerError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            community: community.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl DailySource for PowerClient {
    fn fetch_daily(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PowerDailyResponse, PowerError> {
        let url = build_daily_url(&self.base_url, &self.community, latitude, longitude, start, end);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(PowerError::Http(response.status().as_u16()));
        }

        let body = response.text()?;
        parse_daily_response(&body)
    }
}

// ============================================================================
// URL construction and parsing
// ============================================================================

/// Builds the daily point URL for every core and optional parameter.
pub fn build_daily_url(
    base_url: &str,
    community: &str,
    latitude: f64,
    longitude: f64,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let parameters: Vec<&str> = CORE_PARAMETERS
        .iter()
        .chain(OPTIONAL_PARAMETERS.iter())
        .copied()
        .collect();
    format!(
        "{}/api/temporal/daily/point?parameters={}&community={}&longitude={}&latitude={}&start={}&end={}&format=JSON",
        base_url,
        parameters.join(","),
        community,
        longitude,
        latitude,
        start.format("%Y%m%d"),
        end.format("%Y%m%d"),
    )
}

/// Deserializes a raw response body.
pub fn parse_daily_response(body: &str) -> Result<PowerDailyResponse, PowerError> {
    serde_json::from_str(body).map_err(|e| PowerError::Parse(e.to_string()))
}

/// Converts one year's response into records.
///
/// Days are taken from the mean-temperature series. A day missing any core
/// value (absent or `-999`) is dropped on its own; a missing parameter block,
/// a missing core series, or a malformed date key fails the whole year.
pub fn extract_records(response: &PowerDailyResponse, year: i32) -> Result<ParsedWindow, PowerError> {
    let parameters = response
        .properties
        .as_ref()
        .and_then(|p| p.parameter.as_ref())
        .ok_or_else(|| PowerError::MissingParameter("properties.parameter".to_string()))?;

    let temps = parameters
        .get(PARAM_TEMP_MEAN)
        .ok_or_else(|| PowerError::MissingParameter(PARAM_TEMP_MEAN.to_string()))?;
    if let Some(missing) = CORE_PARAMETERS.iter().find(|code| !parameters.contains_key(**code)) {
        return Err(PowerError::MissingParameter(missing.to_string()));
    }

    let value = |param: &str, key: &str| -> Option<f64> {
        usable(parameters.get(param).and_then(|series| series.get(key)).copied().flatten())
    };

    let mut records = Vec::with_capacity(temps.len());
    let mut dropped_days = 0;

    for date_key in temps.keys() {
        let date = NaiveDate::parse_from_str(date_key, "%Y%m%d")
            .map_err(|_| PowerError::InvalidDateKey(date_key.clone()))?;

        let core = (
            value(PARAM_TEMP_MEAN, date_key),
            value(PARAM_TEMP_MAX, date_key),
            value(PARAM_TEMP_MIN, date_key),
            value(PARAM_PRECIP, date_key),
            value(PARAM_WIND, date_key),
        );
        let (Some(temperature), Some(temp_max), Some(temp_min), Some(precipitation), Some(wind_speed)) = core
        else {
            dropped_days += 1;
            continue;
        };

        let humidity = value(PARAM_HUMIDITY, date_key);
        let heat_index = match humidity {
            Some(rh) if temperature >= HEAT_INDEX_MIN_TEMP_C => Some(heat_index_c(temperature, rh)),
            _ => None,
        };

        records.push(DailyRecord {
            year,
            date,
            month: date.month(),
            day: date.day(),
            temperature,
            temp_max,
            temp_min,
            precipitation,
            wind_speed,
            humidity,
            cloud_cover: value(PARAM_CLOUD, date_key),
            heat_index,
            pressure: value(PARAM_PRESSURE, date_key),
        });
    }

    Ok(ParsedWindow {
        records,
        dropped_days,
    })
}

// ============================================================================
// Derived indices
// ============================================================================

/// Heat index (feels-like temperature) in °C, Rothfusz regression.
///
/// The regression is defined in °F, so the input is converted there and the
/// result converted back.
pub fn heat_index_c(temp_c: f64, relative_humidity: f64) -> f64 {
    let t = temp_c * 9.0 / 5.0 + 32.0;
    let rh = relative_humidity;
    let hi = -42.379 + 2.04901523 * t + 10.14333127 * rh
        - 0.22475541 * t * rh
        - 0.00683783 * t * t
        - 0.05481717 * rh * rh
        + 0.00122874 * t * t * rh
        + 0.00085282 * t * rh * rh
        - 0.00000199 * t * t * rh * rh;
    (hi - 32.0) * 5.0 / 9.0
}

// ============================================================================
// Tests
// ============================================================================

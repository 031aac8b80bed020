//! CSV and JSON export of analysis results.
//!
//! Two documents are produced per analysis: a one-row summary and the full
//! filtered table. Both carry the same metadata block. In CSV it is written
//! as leading `# key: value` comment lines, in JSON as a `metadata` object
//! next to a `data` array.
//!
//! The table exporters are lossless: re-reading an exported table with
//! [`read_table`] yields records equal to the ones written. Only the summary
//! row is rounded.

use crate::analysis::risk::RiskResult;
use crate::model::DailyRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

pub const DATA_SOURCE_NAME: &str = "NASA POWER API";

/// Column order of an exported table.
pub const TABLE_COLUMNS: [&str; 13] = [
    "year",
    "date",
    "month",
    "day",
    "temperature",
    "temp_max",
    "temp_min",
    "precipitation",
    "wind_speed",
    "humidity",
    "cloud_cover",
    "heat_index",
    "pressure",
];

/// Column order of an exported summary.
pub const SUMMARY_COLUMNS: [&str; 6] = ["Location", "Date", "Activity", "Risk_Percent", "High_C", "Low_C"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown export format '{0}' (expected csv or json)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub data_source: String,
    pub location: String,
    /// `"Lat: <lat>, Lon: <lon>"`.
    pub coordinates: String,
    pub date_generated: String,
    pub units: BTreeMap<String, String>,
    pub data_variables: Vec<String>,
    pub analysis_date: String,
}

impl ExportMetadata {
    pub fn new(
        location: &str,
        latitude: f64,
        longitude: f64,
        analysis_date: NaiveDate,
        generated_on: NaiveDate,
        data_variables: &[&str],
    ) -> Self {
        let units = [
            ("temperature", "Celsius"),
            ("precipitation", "mm"),
            ("wind_speed", "m/s"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            data_source: DATA_SOURCE_NAME.to_string(),
            location: location.to_string(),
            coordinates: format!("Lat: {}, Lon: {}", latitude, longitude),
            date_generated: generated_on.format("%Y-%m-%d").to_string(),
            units,
            data_variables: data_variables.iter().map(|v| v.to_string()).collect(),
            analysis_date: analysis_date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Metadata lines for the head of a CSV document, without trailing newline.
    fn csv_header_lines(&self) -> Vec<String> {
        let units: Vec<String> = self.units.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        vec![
            format!("# data_source: {}", self.data_source),
            format!("# location: {}", self.location),
            format!("# coordinates: {}", self.coordinates),
            format!("# date_generated: {}", self.date_generated),
            format!("# units: {}", units.join(", ")),
            format!("# data_variables: {}", self.data_variables.join(", ")),
            format!("# analysis_date: {}", self.analysis_date),
        ]
    }
}

// ---------------------------------------------------------------------------
// Summary row
// ---------------------------------------------------------------------------

/// One-row summary of an analysis, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Activity")]
    pub activity: String,
    /// Two decimal places.
    #[serde(rename = "Risk_Percent")]
    pub risk_percent: f64,
    /// One decimal place.
    #[serde(rename = "High_C")]
    pub high_c: f64,
    /// One decimal place.
    #[serde(rename = "Low_C")]
    pub low_c: f64,
}

impl SummaryRow {
    pub fn from_result(location: &str, date: NaiveDate, activity: &str, result: &RiskResult) -> Self {
        Self {
            location: location.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            activity: activity.to_string(),
            risk_percent: round_to(result.overall_risk, 2),
            high_c: round_to(result.stats.typical_high, 1),
            low_c: round_to(result.stats.typical_low, 1),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Document<'a, T> {
    metadata: &'a ExportMetadata,
    data: &'a [T],
}

fn write_rows<W, T>(
    mut out: W,
    format: ExportFormat,
    metadata: &ExportMetadata,
    rows: &[T],
) -> Result<(), ExportError>
where
    W: Write,
    T: Serialize,
{
    match format {
        ExportFormat::Csv => {
            for line in metadata.csv_header_lines() {
                writeln!(out, "{}", line)?;
            }
            let mut wtr = csv::Writer::from_writer(&mut out);
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &Document { metadata, data: rows })?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

pub fn write_summary<W: Write>(
    out: W,
    format: ExportFormat,
    metadata: &ExportMetadata,
    row: &SummaryRow,
) -> Result<(), ExportError> {
    write_rows(out, format, metadata, std::slice::from_ref(row))
}

pub fn write_table<W: Write>(
    out: W,
    format: ExportFormat,
    metadata: &ExportMetadata,
    table: &[DailyRecord],
) -> Result<(), ExportError> {
    write_rows(out, format, metadata, table)
}

pub fn write_summary_file(
    path: &Path,
    format: ExportFormat,
    metadata: &ExportMetadata,
    row: &SummaryRow,
) -> Result<(), ExportError> {
    write_summary(BufWriter::new(File::create(path)?), format, metadata, row)
}

pub fn write_table_file(
    path: &Path,
    format: ExportFormat,
    metadata: &ExportMetadata,
    table: &[DailyRecord],
) -> Result<(), ExportError> {
    write_table(BufWriter::new(File::create(path)?), format, metadata, table)
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TableDocument {
    data: Vec<DailyRecord>,
}

/// Parses a CSV table, skipping `#` metadata lines.
pub fn read_table_csv<R: Read>(input: R) -> Result<Vec<DailyRecord>, ExportError> {
    let mut rdr = csv::ReaderBuilder::new().comment(Some(b'#')).from_reader(input);
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Parses a JSON table document; the metadata block is ignored.
pub fn read_table_json<R: Read>(input: R) -> Result<Vec<DailyRecord>, ExportError> {
    let doc: TableDocument = serde_json::from_reader(input)?;
    Ok(doc.data)
}

pub fn read_table<R: Read>(input: R, format: ExportFormat) -> Result<Vec<DailyRecord>, ExportError> {
    match format {
        ExportFormat::Csv => read_table_csv(input),
        ExportFormat::Json => read_table_json(input),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

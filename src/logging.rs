/// Structured logging for the weather risk service
///
/// Thin layer over the `log` facade that tags every message with the data
/// source and an optional location/year context, and classifies per-year
/// fetch failures so expected gaps log quietly while service problems log
/// loudly. `pretty_env_logger` is the backend; the filter is read from
/// `PARADE_RISK_LOG` and falls back to the level passed to [`init_logger`].

use crate::model::PowerError;
use log::LevelFilter;
use std::fmt;

/// Environment variable holding the log filter, `env_logger` syntax.
pub const LOG_ENV_VAR: &str = "PARADE_RISK_LOG";

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Power,
    Cache,
    Export,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Power => write!(f, "POWER"),
            DataSource::Cache => write!(f, "CACHE"),
            DataSource::Export => write!(f, "EXPORT"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the year simply has no data for this calendar day
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Initialize the global logger.
///
/// Safe to call more than once; later calls are ignored (tests and the
/// binary may both try).
pub fn init_logger(default_level: LevelFilter) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(default_level);
    if let Ok(filters) = std::env::var(LOG_ENV_VAR) {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

fn line(source: DataSource, context: Option<&str>, message: &str) -> String {
    match context {
        Some(ctx) => format!("{} [{}]: {}", source, ctx, message),
        None => format!("{}: {}", source, message),
    }
}

/// Log a general informational message
pub fn info(source: DataSource, context: Option<&str>, message: &str) {
    log::info!("{}", line(source, context, message));
}

/// Log a warning message
pub fn warn(source: DataSource, context: Option<&str>, message: &str) {
    log::warn!("{}", line(source, context, message));
}

/// Log an error message
pub fn error(source: DataSource, context: Option<&str>, message: &str) {
    log::error!("{}", line(source, context, message));
}

/// Log a debug message
pub fn debug(source: DataSource, context: Option<&str>, message: &str) {
    log::debug!("{}", line(source, context, message));
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a per-year POWER failure.
///
/// An impossible calendar date is part of normal operation. HTTP status,
/// timeouts and parse failures point at the service or at an API change.
/// Missing series usually mean the provider has no coverage there.
pub fn classify_fetch_failure(err: &PowerError) -> FailureType {
    match err {
        PowerError::InvalidCenterDate { .. } => FailureType::Expected,
        PowerError::Http(_)
        | PowerError::Timeout
        | PowerError::Parse(_)
        | PowerError::InvalidDateKey(_) => FailureType::Unexpected,
        PowerError::MissingParameter(_) | PowerError::Transport(_) => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a skipped year with automatic classification
pub fn log_year_failure(context: &str, year: i32, err: &PowerError) {
    let failure_type = classify_fetch_failure(err);
    let message = format!("year {} skipped [{}]: {}", year, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(DataSource::Power, Some(context), &message),
        FailureType::Unexpected => error(DataSource::Power, Some(context), &message),
        FailureType::Unknown => warn(DataSource::Power, Some(context), &message),
    }
}

// ---------------------------------------------------------------------------
// Fetch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a multi-year fetch
pub fn log_fetch_summary(context: &str, total: usize, successful: usize, records: usize) {
    let failed = total - successful.min(total);
    let message = format!(
        "Fetch complete: {}/{} years successful, {} failed, {} daily records",
        successful, total, failed, records
    );

    if failed == 0 {
        info(DataSource::Power, Some(context), &message);
    } else if successful == 0 {
        error(DataSource::Power, Some(context), &message);
    } else {
        warn(DataSource::Power, Some(context), &message);
    }
}

/// Turns fetched history into risk figures for one activity.
///
/// Submodules:
/// - `risk`: ±3-day window filter, exceedance percentages and statistics.
/// - `trend`: per-year means, least-squares slope and moving average.
///
/// [`analyze`] is the request-level step that sits between the fetcher and
/// presentation: it maps an empty fetch or a thin window to an
/// [`AnalysisError`] and attaches advisories about the sample.

pub mod risk;
pub mod trend;

use crate::ingest::power::DailySource;
use crate::ingest::{CachedFetcher, FetchProgress, FetchReport, MIN_YEARS_FOR_CONFIDENCE};
use crate::model::{ActivityThresholds, AnalysisError, FetchRequest};
use risk::RiskResult;
use std::sync::Arc;
use std::time::Instant;

/// Caveats that accompany a successful analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// Fewer than five years produced data.
    ThinSample { successful_years: usize },
    /// Years that were skipped, with a printable reason each.
    SkippedYears(Vec<(i32, String)>),
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::ThinSample { successful_years } => write!(
                f,
                "only {} year(s) of data were available (at least {} recommended); treat these figures with caution",
                successful_years, MIN_YEARS_FOR_CONFIDENCE
            ),
            Advisory::SkippedYears(years) => {
                let listed: Vec<String> = years.iter().map(|(y, why)| format!("{} ({})", y, why)).collect();
                write!(f, "skipped years: {}", listed.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: RiskResult,
    pub requested_years: usize,
    pub successful_years: usize,
    pub advisories: Vec<Advisory>,
    /// The fetch this analysis was computed from, shared with the cache.
    pub report: Arc<FetchReport>,
}

/// Aggregates `report` for the target calendar day.
pub fn analyze(
    report: Arc<FetchReport>,
    month: u32,
    day: u32,
    thresholds: &ActivityThresholds,
) -> Result<Analysis, AnalysisError> {
    if report.records.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }

    let result = risk::aggregate(&report.records, month, day, thresholds).ok_or_else(|| {
        AnalysisError::InsufficientSample {
            found: risk::filter_window(&report.records, month, day).len(),
            required: risk::MIN_SAMPLE_SIZE,
        }
    })?;

    let mut advisories = Vec::new();
    if report.is_thin() {
        advisories.push(Advisory::ThinSample {
            successful_years: report.successful_years(),
        });
    }
    let skipped: Vec<(i32, String)> = report
        .skip_reasons()
        .into_iter()
        .map(|(year, reason)| (year, reason.to_string()))
        .collect();
    if !skipped.is_empty() {
        advisories.push(Advisory::SkippedYears(skipped));
    }

    Ok(Analysis {
        result,
        requested_years: report.requested_years(),
        successful_years: report.successful_years(),
        advisories,
        report,
    })
}

/// Fetches (through the cache) and analyzes one request.
pub fn analyze_request_at<S, P>(
    fetcher: &CachedFetcher<S>,
    request: &FetchRequest,
    thresholds: &ActivityThresholds,
    current_year: i32,
    now: Instant,
    on_progress: P,
) -> Result<Analysis, AnalysisError>
where
    S: DailySource,
    P: FnMut(FetchProgress),
{
    let report = fetcher.fetch_at(request, current_year, now, on_progress);
    analyze(report, request.month(), request.day(), thresholds)
}

/// [`analyze_request_at`] with the real clock.
pub fn analyze_request<S, P>(
    fetcher: &CachedFetcher<S>,
    request: &FetchRequest,
    thresholds: &ActivityThresholds,
    on_progress: P,
) -> Result<Analysis, AnalysisError>
where
    S: DailySource,
    P: FnMut(FetchProgress),
{
    use chrono::Datelike;
    analyze_request_at(
        fetcher,
        request,
        thresholds,
        chrono::Utc::now().year(),
        Instant::now(),
        on_progress,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::YearOutcome;
    use crate::model::{DailyRecord, PowerError};
    use chrono::NaiveDate;

    const PICNIC: ActivityThresholds = ActivityThresholds {
        temp_min: 15.0,
        temp_max: 35.0,
        rain: 1.0,
        wind: 12.0,
    };

    fn rec(year: i32, day: u32) -> DailyRecord {
        DailyRecord {
            year,
            date: NaiveDate::from_ymd_opt(year, 7, day).unwrap(),
            month: 7,
            day,
            temperature: 24.0,
            temp_max: 29.0,
            temp_min: 18.0,
            precipitation: 0.0,
            wind_speed: 3.0,
            humidity: None,
            cloud_cover: None,
            heat_index: None,
            pressure: None,
        }
    }

    fn report(years: &[i32], days: &[u32]) -> FetchReport {
        let mut r = FetchReport::default();
        for &y in years {
            r.records.extend(days.iter().map(|&d| rec(y, d)));
            r.years.push(YearOutcome::Fetched {
                year: y,
                records: days.len(),
                dropped_days: 0,
            });
        }
        r
    }

    #[test]
    fn test_empty_report_is_empty_dataset() {
        let err = analyze(Arc::new(FetchReport::default()), 7, 15, &PICNIC).unwrap_err();
        assert_eq!(err, AnalysisError::EmptyDataset);
    }

    #[test]
    fn test_thin_window_reports_counts() {
        // Three years × three in-window days = 9.
        let r = report(&[2021, 2022, 2023], &[14, 15, 16, 25]);
        let err = analyze(Arc::new(r), 7, 15, &PICNIC).unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientSample { found: 9, required: 10 });
    }

    #[test]
    fn test_thin_sample_advisory_below_five_years() {
        let r = report(&[2021, 2022, 2023, 2024], &[13, 14, 15, 16, 17]);
        let analysis = analyze(Arc::new(r), 7, 15, &PICNIC).unwrap();
        assert_eq!(analysis.successful_years, 4);
        assert_eq!(
            analysis.advisories,
            vec![Advisory::ThinSample { successful_years: 4 }]
        );
    }

    #[test]
    fn test_skipped_years_become_an_advisory() {
        let mut r = report(&(2015..2025).collect::<Vec<_>>(), &[15]);
        r.years.push(YearOutcome::Skipped {
            year: 2025,
            reason: PowerError::Timeout,
        });
        let analysis = analyze(Arc::new(r), 7, 15, &PICNIC).unwrap();
        assert_eq!(analysis.requested_years, 11);
        assert_eq!(
            analysis.advisories,
            vec![Advisory::SkippedYears(vec![(2025, "request timed out".to_string())])]
        );
        assert_eq!(analysis.result.overall_risk, 0.0);
    }
}

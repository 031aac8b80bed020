//! Historical daily-weather ingestion.
//!
//! Submodules:
//! - `power`: NASA POWER HTTP client and response parsing.
//! - `window`: lookback year range and per-year ±5-day date windows.
//!
//! [`HistoricalFetcher`] walks the lookback years one request at a time and
//! never fails as a whole: each year ends up either `Fetched` or `Skipped`
//! with a reason. [`CachedFetcher`] memoizes complete reports by request.

pub mod power;
pub mod window;

use crate::cache::TtlCache;
use crate::logging::{self, DataSource};
use crate::model::{DailyRecord, FetchRequest, PowerError};
use chrono::Datelike;
use power::DailySource;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fewer successful years than this triggers the thin-sample advisory.
pub const MIN_YEARS_FOR_CONFIDENCE: usize = 5;

/// Source policy: identical requests within two hours reuse the result.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Per-year outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum YearOutcome {
    Fetched {
        year: i32,
        records: usize,
        dropped_days: usize,
    },
    Skipped {
        year: i32,
        reason: PowerError,
    },
}

impl YearOutcome {
    pub fn year(&self) -> i32 {
        match self {
            YearOutcome::Fetched { year, .. } | YearOutcome::Skipped { year, .. } => *year,
        }
    }

    /// A year counts as successful only if it contributed at least one record.
    pub fn yielded_data(&self) -> bool {
        matches!(self, YearOutcome::Fetched { records, .. } if *records > 0)
    }
}

/// Progress notification emitted before each year's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    pub year: i32,
    /// 1-based position within the lookback range.
    pub index: usize,
    pub total: usize,
}

/// Everything a fetch produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchReport {
    /// Validated records across all years, in year then date order.
    pub records: Vec<DailyRecord>,
    pub years: Vec<YearOutcome>,
}

impl FetchReport {
    pub fn requested_years(&self) -> usize {
        self.years.len()
    }

    pub fn successful_years(&self) -> usize {
        self.years.iter().filter(|y| y.yielded_data()).count()
    }

    /// `(year, reason)` for each skipped year.
    pub fn skip_reasons(&self) -> Vec<(i32, &PowerError)> {
        self.years
            .iter()
            .filter_map(|y| match y {
                YearOutcome::Skipped { year, reason } => Some((*year, reason)),
                YearOutcome::Fetched { .. } => None,
            })
            .collect()
    }

    /// True when fewer than [`MIN_YEARS_FOR_CONFIDENCE`] years yielded data.
    pub fn is_thin(&self) -> bool {
        self.successful_years() < MIN_YEARS_FOR_CONFIDENCE
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct HistoricalFetcher<S> {
    source: S,
    floor_year: i32,
}

impl<S: DailySource> HistoricalFetcher<S> {
    pub fn new(source: S) -> Self {
        Self::with_floor_year(source, window::DATA_FLOOR_YEAR)
    }

    pub fn with_floor_year(source: S, floor_year: i32) -> Self {
        Self { source, floor_year }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches using the real current year.
    pub fn fetch(&self, request: &FetchRequest) -> FetchReport {
        self.fetch_at(request, chrono::Utc::now().year(), |_| {})
    }

    /// Fetches every lookback year before `current_year`, sequentially.
    ///
    /// `on_progress` is called before each year's request.
    pub fn fetch_at<P>(&self, request: &FetchRequest, current_year: i32, mut on_progress: P) -> FetchReport
    where
        P: FnMut(FetchProgress),
    {
        let context = request.label();
        let years = window::lookback_years(current_year, request.years_back(), self.floor_year);
        let total = years.len();
        let mut report = FetchReport::default();

        for (i, year) in years.enumerate() {
            on_progress(FetchProgress {
                year,
                index: i + 1,
                total,
            });

            match self.fetch_year(request, year) {
                Ok(parsed) => {
                    logging::debug(
                        DataSource::Power,
                        Some(&context),
                        &format!(
                            "year {}: {} records, {} days dropped",
                            year,
                            parsed.records.len(),
                            parsed.dropped_days
                        ),
                    );
                    report.years.push(YearOutcome::Fetched {
                        year,
                        records: parsed.records.len(),
                        dropped_days: parsed.dropped_days,
                    });
                    report.records.extend(parsed.records);
                }
                Err(reason) => {
                    logging::log_year_failure(&context, year, &reason);
                    report.years.push(YearOutcome::Skipped { year, reason });
                }
            }
        }

        logging::log_fetch_summary(&context, total, report.successful_years(), report.records.len());
        report
    }

    fn fetch_year(&self, request: &FetchRequest, year: i32) -> Result<power::ParsedWindow, PowerError> {
        let center = window::center_date(year, request.month(), request.day())?;
        let (start, end) = window::fetch_window(center)?;
        let response = self
            .source
            .fetch_daily(request.latitude(), request.longitude(), start, end)?;
        power::extract_records(&response, year)
    }
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

/// Coordinates are rounded to this many decimal places for the cache key
/// (about 11 m at the equator).
pub const KEY_COORD_DECIMALS: i32 = 4;

/// Cache key: rounded coordinates, calendar day, lookback, and the year the
/// lookback counts back from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchKey {
    lat_e4: i64,
    lon_e4: i64,
    month: u32,
    day: u32,
    years_back: u32,
    current_year: i32,
}

impl FetchKey {
    pub fn new(r: &FetchRequest, current_year: i32) -> Self {
        let scale = 10f64.powi(KEY_COORD_DECIMALS);
        Self {
            lat_e4: (r.latitude() * scale).round() as i64,
            lon_e4: (r.longitude() * scale).round() as i64,
            month: r.month(),
            day: r.day(),
            years_back: r.years_back(),
            current_year,
        }
    }
}

/// A fetcher whose complete reports are memoized for the cache TTL.
pub struct CachedFetcher<S> {
    inner: HistoricalFetcher<S>,
    cache: TtlCache<FetchKey, Arc<FetchReport>>,
}

impl<S: DailySource> CachedFetcher<S> {
    pub fn new(inner: HistoricalFetcher<S>) -> Self {
        Self::with_cache(inner, DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache(inner: HistoricalFetcher<S>, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl, capacity),
        }
    }

    pub fn inner(&self) -> &HistoricalFetcher<S> {
        &self.inner
    }

    pub fn fetch(&self, request: &FetchRequest) -> Arc<FetchReport> {
        self.fetch_at(request, chrono::Utc::now().year(), Instant::now(), |_| {})
    }

    /// Returns the cached report for `request` if live at `now`, otherwise
    /// fetches it. Progress is only reported on a miss.
    ///
    /// A report in which no year succeeded is returned but not stored, so the
    /// next call after a provider outage fetches again.
    pub fn fetch_at<P>(
        &self,
        request: &FetchRequest,
        current_year: i32,
        now: Instant,
        on_progress: P,
    ) -> Arc<FetchReport>
    where
        P: FnMut(FetchProgress),
    {
        let key = FetchKey::new(request, current_year);
        let loaded = self.cache.get_or_try_insert_with_at(key, now, || {
            let report = Arc::new(self.inner.fetch_at(request, current_year, on_progress));
            if report.successful_years() == 0 {
                Err(report)
            } else {
                Ok(report)
            }
        });
        match loaded {
            Ok((report, true)) => {
                logging::debug(DataSource::Cache, Some(&request.label()), "served from cache");
                report
            }
            Ok((report, false)) => report,
            Err(empty) => {
                logging::warn(
                    DataSource::Cache,
                    Some(&request.label()),
                    "no year succeeded; report not cached",
                );
                empty
            }
        }
    }

    /// Drops expired reports.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        self.cache.purge_expired_at(now)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use power::{PowerDailyResponse, parse_daily_response};
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;

    /// Serves a full 11-day window of mild weather for every year except
    /// those listed in `failing`.
    /// While `outage` is set, every year fails.
    struct StubSource {
        failing: HashSet<i32>,
        outage: Cell<bool>,
        calls: RefCell<Vec<(NaiveDate, NaiveDate)>>,
    }

    impl StubSource {
        fn new(failing: &[i32]) -> Self {
            Self {
                failing: failing.iter().copied().collect(),
                outage: Cell::new(false),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    fn window_json(start: NaiveDate, end: NaiveDate) -> String {
        let mut days = Vec::new();
        let mut d = start;
        while d <= end {
            days.push(d.format("%Y%m%d").to_string());
            d = d.succ_opt().unwrap();
        }
        let series = |v: f64| {
            let entries: Vec<String> = days.iter().map(|k| format!("\"{}\": {}", k, v)).collect();
            format!("{{{}}}", entries.join(","))
        };
        format!(
            r#"{{"properties": {{"parameter": {{"T2M": {}, "T2M_MAX": {}, "T2M_MIN": {}, "PRECTOTCORR": {}, "WS2M": {}}}}}}}"#,
            series(20.0),
            series(25.0),
            series(15.0),
            series(0.5),
            series(3.0)
        )
    }

    impl DailySource for StubSource {
        fn fetch_daily(
            &self,
            _latitude: f64,
            _longitude: f64,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<PowerDailyResponse, PowerError> {
            self.calls.borrow_mut().push((start, end));
            if self.outage.get() || self.failing.contains(&end.year()) {
                return Err(PowerError::Http(503));
            }
            parse_daily_response(&window_json(start, end))
        }
    }

    fn request(month: u32, day: u32, years_back: u32) -> FetchRequest {
        FetchRequest::new(40.6936, -89.589, month, day, years_back).unwrap()
    }

    #[test]
    fn test_fetch_covers_each_lookback_year_once() {
        let fetcher = HistoricalFetcher::new(StubSource::new(&[]));
        let report = fetcher.fetch_at(&request(7, 15, 15), 2026, |_| {});

        assert_eq!(report.requested_years(), 15);
        assert_eq!(report.successful_years(), 15);
        assert_eq!(report.records.len(), 15 * 11);
        assert_eq!(fetcher.source().calls.borrow().len(), 15);
        assert!(!report.is_thin());
    }

    #[test]
    fn test_failed_year_is_skipped_and_fetch_continues() {
        let fetcher = HistoricalFetcher::new(StubSource::new(&[2015, 2020]));
        let report = fetcher.fetch_at(&request(7, 15, 15), 2026, |_| {});

        assert_eq!(report.successful_years(), 13);
        assert_eq!(report.records.len(), 13 * 11);
        assert_eq!(
            report.skip_reasons(),
            vec![(2015, &PowerError::Http(503)), (2020, &PowerError::Http(503))]
        );
    }

    /// Answers every year with a response that has no wind series.
    struct NoWindSource;

    impl DailySource for NoWindSource {
        fn fetch_daily(
            &self,
            _latitude: f64,
            _longitude: f64,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<PowerDailyResponse, PowerError> {
            let mut response = parse_daily_response(&window_json(start, end))?;
            if let Some(parameters) = response.properties.as_mut().and_then(|p| p.parameter.as_mut()) {
                parameters.remove("WS2M");
            }
            Ok(response)
        }
    }

    #[test]
    fn test_missing_series_is_a_skip_reason() {
        let fetcher = HistoricalFetcher::new(NoWindSource);
        let report = fetcher.fetch_at(&request(7, 15, 2), 2026, |_| {});

        assert_eq!(report.successful_years(), 0);
        let missing = PowerError::MissingParameter("WS2M".to_string());
        assert_eq!(report.skip_reasons(), vec![(2024, &missing), (2025, &missing)]);
    }

    #[test]
    fn test_thin_sample_when_fewer_than_five_years_succeed() {
        let failing: Vec<i32> = (2011..2023).collect();
        let fetcher = HistoricalFetcher::new(StubSource::new(&failing));
        let report = fetcher.fetch_at(&request(7, 15, 15), 2026, |_| {});
        assert_eq!(report.successful_years(), 3);
        assert!(report.is_thin());
    }

    #[test]
    fn test_feb_29_centers_on_feb_28_in_non_leap_years() {
        let fetcher = HistoricalFetcher::new(StubSource::new(&[]));
        fetcher.fetch_at(&request(2, 29, 4), 2025, |_| {});

        let calls = fetcher.source().calls.borrow();
        let centers: Vec<NaiveDate> = calls.iter().map(|(s, _)| *s + chrono::Days::new(5)).collect();
        assert_eq!(
            centers,
            vec![
                NaiveDate::from_ymd_opt(2021, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2022, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2023, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            ]
        );
    }

    #[test]
    fn test_progress_reported_for_every_year() {
        let fetcher = HistoricalFetcher::new(StubSource::new(&[]));
        let mut seen = Vec::new();
        fetcher.fetch_at(&request(7, 15, 3), 2026, |p| seen.push(p));
        assert_eq!(
            seen,
            vec![
                FetchProgress { year: 2023, index: 1, total: 3 },
                FetchProgress { year: 2024, index: 2, total: 3 },
                FetchProgress { year: 2025, index: 3, total: 3 },
            ]
        );
    }

    #[test]
    fn test_fetch_key_rounds_coordinates() {
        let a = FetchRequest::new(40.693_61, -89.589_04, 7, 15, 15).unwrap();
        let b = FetchRequest::new(40.693_64, -89.588_96, 7, 15, 15).unwrap();
        let c = FetchRequest::new(40.6937, -89.589, 7, 15, 15).unwrap();
        assert_eq!(FetchKey::new(&a, 2026), FetchKey::new(&b, 2026));
        assert_ne!(FetchKey::new(&a, 2026), FetchKey::new(&c, 2026));
        assert_ne!(FetchKey::new(&a, 2026), FetchKey::new(&a, 2027));
    }

    #[test]
    fn test_cached_fetch_within_ttl_does_not_refetch() {
        let cached = CachedFetcher::new(HistoricalFetcher::new(StubSource::new(&[])));
        let t0 = Instant::now();
        let first = cached.fetch_at(&request(7, 15, 5), 2026, t0, |_| {});
        let second = cached.fetch_at(&request(7, 15, 5), 2026, t0 + Duration::from_secs(3600), |_| {});

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cached.inner().source().calls.borrow().len(), 5);
    }

    #[test]
    fn test_cached_fetch_after_ttl_refetches() {
        let cached = CachedFetcher::new(HistoricalFetcher::new(StubSource::new(&[])));
        let t0 = Instant::now();
        cached.fetch_at(&request(7, 15, 5), 2026, t0, |_| {});
        cached.fetch_at(&request(7, 15, 5), 2026, t0 + DEFAULT_CACHE_TTL, |_| {});
        assert_eq!(cached.inner().source().calls.borrow().len(), 10);
    }

    #[test]
    fn test_different_years_back_is_a_different_key() {
        let cached = CachedFetcher::new(HistoricalFetcher::new(StubSource::new(&[])));
        let t0 = Instant::now();
        cached.fetch_at(&request(7, 15, 5), 2026, t0, |_| {});
        cached.fetch_at(&request(7, 15, 6), 2026, t0, |_| {});
        assert_eq!(cached.inner().source().calls.borrow().len(), 11);
    }

    #[test]
    fn test_new_year_within_ttl_refetches() {
        let cached = CachedFetcher::new(HistoricalFetcher::new(StubSource::new(&[])));
        let t0 = Instant::now();
        let old = cached.fetch_at(&request(1, 15, 5), 2026, t0, |_| {});
        let new = cached.fetch_at(&request(1, 15, 5), 2027, t0 + Duration::from_secs(60), |_| {});

        assert_eq!(cached.inner().source().calls.borrow().len(), 10);
        assert_eq!(old.years.last().map(|o| o.year()), Some(2025));
        assert_eq!(new.years.last().map(|o| o.year()), Some(2026));
    }

    #[test]
    fn test_full_outage_is_not_cached() {
        let cached = CachedFetcher::new(HistoricalFetcher::new(StubSource::new(&[])));
        let t0 = Instant::now();

        cached.inner().source().outage.set(true);
        let failed = cached.fetch_at(&request(7, 15, 5), 2026, t0, |_| {});
        assert_eq!(failed.successful_years(), 0);

        cached.inner().source().outage.set(false);
        let recovered = cached.fetch_at(&request(7, 15, 5), 2026, t0 + Duration::from_secs(60), |_| {});
        assert_eq!(recovered.successful_years(), 5);
        assert_eq!(cached.inner().source().calls.borrow().len(), 10);

        let again = cached.fetch_at(&request(7, 15, 5), 2026, t0 + Duration::from_secs(120), |_| {});
        assert!(Arc::ptr_eq(&recovered, &again));
        assert_eq!(cached.inner().source().calls.borrow().len(), 10);
    }
}

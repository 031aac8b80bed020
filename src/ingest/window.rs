//! Year range and per-year date windows for the historical fetch.
//!
//! All functions take the current year as a parameter rather than reading
//! the clock, so tests are deterministic.

use crate::model::PowerError;
use chrono::{Days, NaiveDate};

/// POWER daily coverage starts in 1981.
pub const DATA_FLOOR_YEAR: i32 = 1981;

/// Days on each side of the center date requested from the provider.
pub const FETCH_HALF_WIDTH_DAYS: u64 = 5;

/// Years to sample: `max(floor, current - years_back)` up to but excluding
/// `current_year`.
pub fn lookback_years(current_year: i32, years_back: u32, floor_year: i32) -> std::ops::Range<i32> {
    let start = current_year
        .saturating_sub(years_back.min(i32::MAX as u32) as i32)
        .max(floor_year);
    start..current_year.max(start)
}

/// The center date for `year`.
///
/// Feb 29 falls back to Feb 28 in non-leap years. Any other impossible date
/// is an error and the caller skips that year.
pub fn center_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, PowerError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| {
            if month == 2 && day == 29 {
                NaiveDate::from_ymd_opt(year, 2, 28)
            } else {
                None
            }
        })
        .ok_or(PowerError::InvalidCenterDate { year, month, day })
}

/// Inclusive `(start, end)` dates, `center ± FETCH_HALF_WIDTH_DAYS`.
pub fn fetch_window(center: NaiveDate) -> Result<(NaiveDate, NaiveDate), PowerError> {
    let half = Days::new(FETCH_HALF_WIDTH_DAYS);
    let invalid = || PowerError::InvalidDateKey(center.format("%Y%m%d").to_string());
    let start = center.checked_sub_days(half).ok_or_else(invalid)?;
    let end = center.checked_add_days(half).ok_or_else(invalid)?;
    Ok((start, end))
}

//! Exceedance-probability aggregation over a day-of-year window.
//!
//! Pure functions: the table and thresholds go in, a [`RiskResult`] comes out.
//! Nothing is rounded here; presentation and export round for display.

use crate::model::{ActivityThresholds, DailyRecord};
use serde::Serialize;
use std::collections::BTreeSet;

/// Records within this many days of the target day-of-month are sampled.
pub const FILTER_HALF_WIDTH_DAYS: u32 = 3;

/// Fewer filtered records than this and no statistics are produced.
pub const MIN_SAMPLE_SIZE: usize = 10;

/// A day counts toward `rainy_days` at or above this precipitation.
pub const RAIN_DAY_MM: f64 = 1.0;

/// Humidity above this is "high humidity".
pub const HIGH_HUMIDITY_PCT: f64 = 80.0;

/// Heat index above this is "uncomfortable heat".
pub const UNCOMFORTABLE_HEAT_INDEX_C: f64 = 35.0;

/// Optional factors need strictly more present values than this.
pub const MIN_OPTIONAL_VALUES: usize = 10;

/// Per-factor exceedance percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorRisks {
    pub too_cold: f64,
    pub too_hot: f64,
    pub rainy: f64,
    pub windy: f64,
    /// Only when more than ten filtered records carry humidity.
    pub high_humidity: Option<f64>,
    /// Only when more than ten filtered records carry a heat index.
    pub uncomfortable_heat: Option<f64>,
}

impl FactorRisks {
    /// The four threshold factors as `(name, percent)`, in display order.
    pub fn core(&self) -> [(&'static str, f64); 4] {
        [
            ("too_cold", self.too_cold),
            ("too_hot", self.too_hot),
            ("rainy", self.rainy),
            ("windy", self.windy),
        ]
    }
}

/// Descriptive statistics over the filtered window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub avg_temp: f64,
    /// Median of daily maxima.
    pub typical_high: f64,
    /// Median of daily minima.
    pub typical_low: f64,
    pub max_temp_ever: f64,
    pub min_temp_ever: f64,
    pub avg_precip: f64,
    pub max_precip_ever: f64,
    pub avg_wind: f64,
    pub max_wind_ever: f64,
    /// Days with precipitation at or above 1.0 mm.
    pub rainy_days: usize,
    pub total_days: usize,
    pub years_analyzed: usize,
    pub avg_humidity: Option<f64>,
    pub avg_cloud_cover: Option<f64>,
}

impl WindowStats {
    /// Share of sampled days that were rain days, percent.
    pub fn rain_chance(&self) -> f64 {
        self.rainy_days as f64 / self.total_days as f64 * 100.0
    }
}

/// Aggregator output for one (location, date, activity) query.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskResult {
    pub risks: FactorRisks,
    /// Share of days where at least one factor exceeded its threshold.
    pub overall_risk: f64,
    pub stats: WindowStats,
    pub filtered_table: Vec<DailyRecord>,
}

/// Which unfavorable conditions a single day meets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Exceedance {
    pub too_cold: bool,
    pub too_hot: bool,
    pub rainy: bool,
    pub windy: bool,
}

impl Exceedance {
    pub fn of(record: &DailyRecord, t: &ActivityThresholds) -> Self {
        Self {
            too_cold: record.temp_min < t.temp_min,
            too_hot: record.temp_max > t.temp_max,
            rainy: record.precipitation >= t.rain,
            windy: record.wind_speed >= t.wind,
        }
    }

    pub fn any(&self) -> bool {
        self.too_cold || self.too_hot || self.rainy || self.windy
    }
}

/// True when `record` falls in the sampling window for `month`/`day`.
///
/// Compares raw day-of-month numbers within the same month, so a window near
/// the start or end of a month does not reach into the neighboring month
/// (target July 1 never matches June 30).
pub fn in_window(record: &DailyRecord, month: u32, day: u32) -> bool {
    record.month == month && record.day.abs_diff(day) <= FILTER_HALF_WIDTH_DAYS
}

/// Records in the sampling window, cloned in table order.
pub fn filter_window(table: &[DailyRecord], month: u32, day: u32) -> Vec<DailyRecord> {
    table
        .iter()
        .filter(|r| in_window(r, month, day))
        .cloned()
        .collect()
}

/// Computes factor risks, overall risk and statistics.
///
/// Returns `None` when fewer than [`MIN_SAMPLE_SIZE`] records fall in the
/// window.
pub fn aggregate(
    table: &[DailyRecord],
    month: u32,
    day: u32,
    thresholds: &ActivityThresholds,
) -> Option<RiskResult> {
    let filtered = filter_window(table, month, day);
    if filtered.len() < MIN_SAMPLE_SIZE {
        return None;
    }

    let total = filtered.len();
    let pct = |count: usize| count as f64 / total as f64 * 100.0;

    let flags: Vec<Exceedance> = filtered.iter().map(|r| Exceedance::of(r, thresholds)).collect();
    let count = |f: fn(&Exceedance) -> bool| flags.iter().filter(|e| f(e)).count();

    let humidity: Vec<f64> = filtered.iter().filter_map(|r| r.humidity).collect();
    let heat: Vec<f64> = filtered.iter().filter_map(|r| r.heat_index).collect();

    let risks = FactorRisks {
        too_cold: pct(count(|e| e.too_cold)),
        too_hot: pct(count(|e| e.too_hot)),
        rainy: pct(count(|e| e.rainy)),
        windy: pct(count(|e| e.windy)),
        high_humidity: (humidity.len() > MIN_OPTIONAL_VALUES)
            .then(|| pct(humidity.iter().filter(|h| **h > HIGH_HUMIDITY_PCT).count())),
        uncomfortable_heat: (heat.len() > MIN_OPTIONAL_VALUES)
            .then(|| pct(heat.iter().filter(|h| **h > UNCOMFORTABLE_HEAT_INDEX_C).count())),
    };
    let overall_risk = pct(count(Exceedance::any));

    let highs: Vec<f64> = filtered.iter().map(|r| r.temp_max).collect();
    let lows: Vec<f64> = filtered.iter().map(|r| r.temp_min).collect();
    let precip: Vec<f64> = filtered.iter().map(|r| r.precipitation).collect();
    let wind: Vec<f64> = filtered.iter().map(|r| r.wind_speed).collect();
    let temps: Vec<f64> = filtered.iter().map(|r| r.temperature).collect();
    let clouds: Vec<f64> = filtered.iter().filter_map(|r| r.cloud_cover).collect();

    let stats = WindowStats {
        avg_temp: mean(&temps),
        typical_high: median(&highs),
        typical_low: median(&lows),
        max_temp_ever: max(&highs),
        min_temp_ever: min(&lows),
        avg_precip: mean(&precip),
        max_precip_ever: max(&precip),
        avg_wind: mean(&wind),
        max_wind_ever: max(&wind),
        rainy_days: precip.iter().filter(|p| **p >= RAIN_DAY_MM).count(),
        total_days: total,
        years_analyzed: filtered.iter().map(|r| r.year).collect::<BTreeSet<_>>().len(),
        avg_humidity: (!humidity.is_empty()).then(|| mean(&humidity)),
        avg_cloud_cover: (!clouds.is_empty()).then(|| mean(&clouds)),
    };

    Some(RiskResult {
        risks,
        overall_risk,
        stats,
        filtered_table: filtered,
    })
}

// ---------------------------------------------------------------------------
// Small statistics helpers. Callers guarantee non-empty input.
// ---------------------------------------------------------------------------

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median with the even-length case averaging the two middle values.
pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const BEACH: ActivityThresholds = ActivityThresholds {
        temp_min: 22.0,
        temp_max: 38.0,
        rain: 2.0,
        wind: 10.0,
    };

    /// A day that trips none of the beach thresholds.
    fn fair_day(year: i32, month: u32, day: u32) -> DailyRecord {
        DailyRecord {
            year,
            date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            month,
            day,
            temperature: 28.0,
            temp_max: 32.0,
            temp_min: 24.0,
            precipitation: 0.0,
            wind_speed: 4.0,
            humidity: None,
            cloud_cover: None,
            heat_index: None,
            pressure: None,
        }
    }

    /// Twenty fair July days: 15 years on the 15th, then 5 more on the 14th.
    fn twenty_fair_days() -> Vec<DailyRecord> {
        let mut table: Vec<DailyRecord> = (2010..2025).map(|y| fair_day(y, 7, 15)).collect();
        table.extend((2010..2015).map(|y| fair_day(y, 7, 14)));
        table
    }

    #[test]
    fn test_five_rainy_of_twenty_is_twenty_five_percent() {
        let mut table = twenty_fair_days();
        for r in table.iter_mut().take(5) {
            r.precipitation = 2.0; // at the threshold counts as rainy
        }
        let result = aggregate(&table, 7, 15, &BEACH).expect("20 records is enough");
        assert_eq!(result.risks.rainy, 25.0);
        assert_eq!(result.overall_risk, 25.0);
        assert_eq!(result.stats.total_days, 20);
        assert_eq!(result.stats.years_analyzed, 15);
    }

    #[test]
    fn test_all_fair_days_have_zero_risk() {
        let result = aggregate(&twenty_fair_days(), 7, 15, &BEACH).unwrap();
        assert_eq!(result.overall_risk, 0.0);
        for (name, risk) in result.risks.core() {
            assert_eq!(risk, 0.0, "{} should be 0", name);
        }
    }

    #[test]
    fn test_every_day_too_cold_is_one_hundred_percent() {
        let mut table = twenty_fair_days();
        for r in table.iter_mut() {
            r.temp_min = 10.0;
        }
        let result = aggregate(&table, 7, 15, &BEACH).unwrap();
        assert_eq!(result.risks.too_cold, 100.0);
        assert_eq!(result.overall_risk, 100.0);
    }

    #[test]
    fn test_overall_is_union_not_sum() {
        let mut table = twenty_fair_days();
        // Same four days are both rainy and windy; two more only too hot.
        for r in table.iter_mut().take(4) {
            r.precipitation = 10.0;
            r.wind_speed = 12.0;
        }
        for r in table.iter_mut().skip(4).take(2) {
            r.temp_max = 40.0;
        }
        let result = aggregate(&table, 7, 15, &BEACH).unwrap();
        assert_eq!(result.risks.rainy, 20.0);
        assert_eq!(result.risks.windy, 20.0);
        assert_eq!(result.risks.too_hot, 10.0);
        assert_eq!(result.overall_risk, 30.0);

        let sum: f64 = result.risks.core().iter().map(|(_, r)| r).sum();
        assert!(sum > result.overall_risk);
        let max = result.risks.core().iter().map(|(_, r)| *r).fold(0.0, f64::max);
        assert!(result.overall_risk >= max);
        assert!(result.overall_risk <= 100.0);
    }

    #[test]
    fn test_threshold_boundaries() {
        let mut table = twenty_fair_days();
        table[0].temp_min = 22.0; // equal: not too cold
        table[1].temp_max = 38.0; // equal: not too hot
        table[2].wind_speed = 10.0; // equal: windy
        let result = aggregate(&table, 7, 15, &BEACH).unwrap();
        assert_eq!(result.risks.too_cold, 0.0);
        assert_eq!(result.risks.too_hot, 0.0);
        assert_eq!(result.risks.windy, 5.0);
    }

    #[test]
    fn test_fewer_than_ten_filtered_records_is_insufficient() {
        let mut table: Vec<DailyRecord> = (2016..2025).map(|y| fair_day(y, 7, 15)).collect();
        // Plenty of raw records, but outside the ±3-day window.
        table.extend((2000..2025).map(|y| fair_day(y, 7, 25)));
        assert_eq!(filter_window(&table, 7, 15).len(), 9);
        assert!(aggregate(&table, 7, 15, &BEACH).is_none());
    }

    #[test]
    fn test_window_is_plus_minus_three_days_same_month() {
        let table: Vec<DailyRecord> = [11, 12, 18, 19]
            .iter()
            .map(|d| fair_day(2020, 7, *d))
            .collect();
        let kept: Vec<u32> = filter_window(&table, 7, 15).iter().map(|r| r.day).collect();
        assert_eq!(kept, vec![12, 18]);
    }

    #[test]
    fn test_window_does_not_cross_month_boundary() {
        let table = vec![fair_day(2020, 6, 30), fair_day(2020, 7, 1), fair_day(2020, 7, 4)];
        let kept: Vec<(u32, u32)> = filter_window(&table, 7, 1)
            .iter()
            .map(|r| (r.month, r.day))
            .collect();
        assert_eq!(kept, vec![(7, 1), (7, 4)]);
    }

    #[test]
    fn test_descriptive_stats() {
        let mut table = twenty_fair_days();
        for (i, r) in table.iter_mut().enumerate() {
            r.temp_max = 30.0 + i as f64; // 30..=49
            r.temp_min = 20.0 - i as f64; // 20..=1
            r.precipitation = if i < 3 { 1.0 } else { 0.5 };
            r.wind_speed = if i == 0 { 9.0 } else { 3.0 };
        }
        let s = aggregate(&table, 7, 15, &BEACH).unwrap().stats;
        assert_eq!(s.typical_high, 39.5);
        assert_eq!(s.typical_low, 10.5);
        assert_eq!(s.max_temp_ever, 49.0);
        assert_eq!(s.min_temp_ever, 1.0);
        assert_eq!(s.max_precip_ever, 1.0);
        assert_eq!(s.rainy_days, 3);
        assert_eq!(s.max_wind_ever, 9.0);
        assert!((s.avg_wind - 3.3).abs() < 1e-9);
        assert!((s.avg_precip - 0.575).abs() < 1e-9);
        assert!((s.rain_chance() - 15.0).abs() < 1e-9);
        assert_eq!(s.avg_humidity, None);
    }

    #[test]
    fn test_optional_factor_risks_need_more_than_ten_values() {
        let mut table = twenty_fair_days();
        for r in table.iter_mut().take(10) {
            r.humidity = Some(90.0);
        }
        let result = aggregate(&table, 7, 15, &BEACH).unwrap();
        assert_eq!(result.risks.high_humidity, None, "exactly ten values is not enough");
        assert_eq!(result.stats.avg_humidity, Some(90.0));

        table[10].humidity = Some(50.0);
        let result = aggregate(&table, 7, 15, &BEACH).unwrap();
        // Denominator is the whole window, not just days with humidity.
        assert_eq!(result.risks.high_humidity, Some(50.0));
    }

    #[test]
    fn test_uncomfortable_heat_does_not_affect_overall() {
        let mut table = twenty_fair_days();
        for r in table.iter_mut() {
            r.heat_index = Some(36.0);
        }
        let result = aggregate(&table, 7, 15, &BEACH).unwrap();
        assert_eq!(result.risks.uncomfortable_heat, Some(100.0));
        assert_eq!(result.overall_risk, 0.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }
}

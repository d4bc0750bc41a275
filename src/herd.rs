//! Per-cow views over herd tables.
//!
//! Herd tables carry one column per cow, keyed by its ID, plus a
//! `Group mean` column for the whole herd.

use crate::table::{TableError, TimeSeriesTable, Timestamp};
use statrs::statistics::Statistics;
use std::fmt;
use std::str::FromStr;

/// Column holding the herd-wide mean.
pub const GROUP_MEAN_COLUMN: &str = "Group mean";

/// Maximum number of digits in a cow ID.
const MAX_COW_ID_DIGITS: usize = 4;

/// A cow identifier: one to four ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CowId(String);

impl CowId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CowId {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.len() > MAX_COW_ID_DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TableError::InvalidCowId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for CowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Select a cow's column, the herd mean, and optionally a second cow.
///
/// Comparing a cow with itself adds no column.
pub fn cow_view(
    table: &TimeSeriesTable,
    cow: &CowId,
    compare: Option<&CowId>,
) -> Result<TimeSeriesTable, TableError> {
    let mut names = vec![cow.as_str(), GROUP_MEAN_COLUMN];
    if let Some(other) = compare.filter(|other| *other != cow) {
        names.push(other.as_str());
    }
    table.select_columns(&names)
}

/// Week number of each timestamp, counting from 1 at the first row.
pub fn week_numbers(timestamps: &[Timestamp]) -> Vec<u32> {
    let Some(&first) = timestamps.first() else {
        return Vec::new();
    };
    timestamps
        .iter()
        .map(|t| ((*t - first).num_days() / 7) as u32 + 1)
        .collect()
}

/// Mean of every column over one week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    pub week: u32,
    pub rows: usize,
    pub means: Vec<f64>,
}

/// Group rows by week number and average each column.
pub fn weekly_means(table: &TimeSeriesTable) -> Vec<WeeklySummary> {
    let weeks = week_numbers(table.timestamps());
    let values = table.values();
    let mut summaries: Vec<WeeklySummary> = Vec::new();

    let mut start = 0;
    while start < weeks.len() {
        let week = weeks[start];
        let end = weeks[start..]
            .iter()
            .position(|&w| w != week)
            .map_or(weeks.len(), |offset| start + offset);

        let means = values
            .columns()
            .into_iter()
            .map(|column| column.slice(ndarray::s![start..end]).iter().mean())
            .collect();

        summaries.push(WeeklySummary {
            week,
            rows: end - start,
            means,
        });
        start = end;
    }

    summaries
}

/// Values of one column across weekly summaries.
pub fn weekly_column(summaries: &[WeeklySummary], index: usize) -> Vec<f64> {
    summaries
        .iter()
        .filter_map(|s| s.means.get(index).copied())
        .collect()
}

/// Least-squares line through values placed at x = 0, 1, 2, ...
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearTrend {
    /// Fitted value at `x`.
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a linear trend to a weekly series.
///
/// A single value gives a flat line through it. Returns `None` for an empty
/// series or one containing `NaN`.
pub fn trend(values: &[f64]) -> Option<LinearTrend> {
    if values.is_empty() {
        return None;
    }
    let y_mean = values.iter().mean();
    if !y_mean.is_finite() {
        return None;
    }
    let x_mean = (values.len() - 1) as f64 / 2.0;

    let (sxy, sxx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };

    Some(LinearTrend {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Alert level of a weekly value against a cow's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// At or above the orange line
    Green,
    /// Below the orange line, at or above the red line
    Orange,
    /// Below the red line
    Red,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Green => write!(f, "Green (healthy)"),
            HealthStatus::Orange => write!(f, "Orange (requires medication)"),
            HealthStatus::Red => write!(f, "Red (not well)"),
        }
    }
}

/// Health lines derived from a cow's weekly means.
///
/// `green` is the mean, `orange` one sample standard deviation below it and
/// `red` two below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    pub green: f64,
    pub orange: f64,
    pub red: f64,
}

impl HealthThresholds {
    pub fn classify(&self, value: f64) -> HealthStatus {
        if value < self.red {
            HealthStatus::Red
        } else if value < self.orange {
            HealthStatus::Orange
        } else {
            HealthStatus::Green
        }
    }
}

/// Compute health thresholds from weekly means.
///
/// Needs at least two finite values.
pub fn health_thresholds(weekly: &[f64]) -> Option<HealthThresholds> {
    if weekly.len() < 2 {
        return None;
    }
    let mean = weekly.iter().mean();
    let std_dev = weekly.iter().std_dev();
    if !mean.is_finite() || !std_dev.is_finite() {
        return None;
    }

    Some(HealthThresholds {
        green: mean,
        orange: mean - std_dev,
        red: mean - 2.0 * std_dev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn herd_table(days: usize) -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rows = (0..days)
            .map(|d| {
                let d = d as f64;
                (start + Duration::days(d as i64), vec![d, 2.0 * d, 10.0 + d])
            })
            .collect();
        TimeSeriesTable::from_rows(
            vec!["6774".to_string(), "6775".to_string(), GROUP_MEAN_COLUMN.to_string()],
            rows,
        )
        .unwrap()
    }

    #[test]
    fn test_cow_id_validation() {
        assert_eq!("6774".parse::<CowId>().unwrap().as_str(), "6774");
        assert!("12".parse::<CowId>().is_ok());
        assert!("".parse::<CowId>().is_err());
        assert!("12345".parse::<CowId>().is_err());
        assert!("67a4".parse::<CowId>().is_err());
    }

    #[test]
    fn test_cow_view_columns() {
        let table = herd_table(3);
        let cow: CowId = "6774".parse().unwrap();
        let other: CowId = "6775".parse().unwrap();

        let view = cow_view(&table, &cow, None).unwrap();
        assert_eq!(view.columns(), &["6774", GROUP_MEAN_COLUMN]);

        let view = cow_view(&table, &cow, Some(&other)).unwrap();
        assert_eq!(view.columns(), &["6774", GROUP_MEAN_COLUMN, "6775"]);

        let missing: CowId = "1".parse().unwrap();
        assert!(cow_view(&table, &missing, None).is_err());
    }

    #[test]
    fn test_compare_with_same_cow() {
        let table = herd_table(3);
        let cow: CowId = "6774".parse().unwrap();
        let same: CowId = " 6774".parse().unwrap();

        let view = cow_view(&table, &cow, Some(&same)).unwrap();
        assert_eq!(view.columns(), &["6774", GROUP_MEAN_COLUMN]);
    }

    #[test]
    fn test_week_numbers() {
        let table = herd_table(15);
        let weeks = week_numbers(table.timestamps());
        assert_eq!(weeks[0], 1);
        assert_eq!(weeks[6], 1);
        assert_eq!(weeks[7], 2);
        assert_eq!(weeks[14], 3);
        assert!(week_numbers(&[]).is_empty());
    }

    #[test]
    fn test_weekly_means() {
        let table = herd_table(10);
        let summaries = weekly_means(&table);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].rows, 7);
        assert_eq!(summaries[0].means[0], 3.0);
        assert_eq!(summaries[1].rows, 3);
        assert_eq!(summaries[1].means[2], 18.0);
        assert_eq!(weekly_column(&summaries, 0), vec![3.0, 8.0]);
        assert!(weekly_column(&summaries, 9).is_empty());
    }

    #[test]
    fn test_trend() {
        let line = trend(&[4.0, 6.0, 8.0]).unwrap();
        assert_eq!(line.slope, 2.0);
        assert_eq!(line.intercept, 4.0);
        assert_eq!(line.at(3.0), 10.0);

        // x mean 1, y mean 2, sxy 1, sxx 2
        let line = trend(&[1.0, 3.0, 2.0]).unwrap();
        assert!((line.slope - 0.5).abs() < 1e-12);
        assert!((line.intercept - 1.5).abs() < 1e-12);

        let flat = trend(&[5.0]).unwrap();
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.intercept, 5.0);

        assert!(trend(&[]).is_none());
        assert!(trend(&[1.0, f64::NAN]).is_none());
    }

    #[test]
    fn test_health_thresholds() {
        // mean 6, sample std 2
        let lines = health_thresholds(&[4.0, 6.0, 8.0]).unwrap();
        assert!((lines.green - 6.0).abs() < 1e-12);
        assert!((lines.orange - 4.0).abs() < 1e-12);
        assert!((lines.red - 2.0).abs() < 1e-12);

        assert_eq!(lines.classify(5.0), HealthStatus::Green);
        assert_eq!(lines.classify(3.0), HealthStatus::Orange);
        assert_eq!(lines.classify(1.5), HealthStatus::Red);

        assert!(health_thresholds(&[4.0]).is_none());
    }

    #[test]
    fn test_weekly_trend_and_thresholds() {
        let table = herd_table(14);
        let summaries = weekly_means(&table);
        let cow = weekly_column(&summaries, 0);
        assert_eq!(cow, vec![3.0, 10.0]);

        let line = trend(&cow).unwrap();
        assert_eq!(line.slope, 7.0);
        assert_eq!(line.intercept, 3.0);

        // std of [3, 10] is sqrt(24.5)
        let lines = health_thresholds(&cow).unwrap();
        assert!((lines.green - 6.5).abs() < 1e-12);
        assert!((lines.orange - (6.5 - 24.5f64.sqrt())).abs() < 1e-12);
        assert_eq!(lines.classify(cow[0]), HealthStatus::Green);
    }
}

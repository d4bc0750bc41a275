//! Cleaning and scaling of raw sensor tables.
//!
//! Steps run in a fixed order: duplicate removal, missing-value
//! interpolation, outlier capping, min-max normalisation. Each step can be
//! turned off through [`PreprocessSettings`]. The result is a validated
//! [`TimeSeriesTable`] ready for sequencing.

pub mod duplicates;
pub mod missing;
pub mod normalize;
pub mod outliers;

use crate::audit::SharedAuditLog;
use crate::table::{RawTable, TableError, TimeSeriesTable};
use serde::{Deserialize, Serialize};

pub use duplicates::remove_duplicates;
pub use missing::{interpolate_column, interpolate_missing, MissingOutcome};
pub use normalize::{min_max_scale, ColumnScale};
pub use outliers::{cap_outliers, Z_SCORE_THRESHOLD};

/// Which preprocessing steps to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    pub interpolate_missing: bool,
    pub remove_duplicates: bool,
    pub cap_outliers: bool,
    pub normalize: bool,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            interpolate_missing: true,
            remove_duplicates: true,
            cap_outliers: true,
            normalize: true,
        }
    }
}

/// Record of what preprocessing did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub values_interpolated: usize,
    pub duplicates_removed: usize,
    pub outliers_capped: usize,
    /// Original range of each column, when normalisation ran
    pub scales: Vec<ColumnScale>,
    /// Human-readable actions, in order
    pub actions: Vec<String>,
}

/// Runs the preprocessing steps over a raw table.
pub struct Preprocessor {
    settings: PreprocessSettings,
    audit: Option<SharedAuditLog>,
}

impl Preprocessor {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self {
            settings,
            audit: None,
        }
    }

    /// Record step counts into `log` as well as the returned report.
    pub fn with_audit_log(mut self, log: SharedAuditLog) -> Self {
        self.audit = Some(log);
        self
    }

    pub fn settings(&self) -> &PreprocessSettings {
        &self.settings
    }

    /// Clean `raw` and convert it into a validated table.
    pub fn run(&self, mut raw: RawTable) -> Result<(TimeSeriesTable, PreprocessReport), TableError> {
        raw.check_shape()?;

        let mut report = PreprocessReport {
            rows_in: raw.row_count(),
            ..Default::default()
        };

        if self.settings.remove_duplicates {
            let removed = remove_duplicates(&mut raw);
            tracing::info!(removed, "duplicate rows removed");
            report.duplicates_removed = removed;
            report
                .actions
                .push(format!("Removed {removed} duplicate rows."));
        }

        if self.settings.interpolate_missing {
            let outcome = interpolate_missing(&mut raw);
            tracing::info!(filled = outcome.filled, "missing values handled");
            report.values_interpolated = outcome.filled;
            report.actions.extend(outcome.actions);
        }

        if self.settings.cap_outliers {
            raw.map_columns(|name, values| {
                let capped = cap_outliers(values);
                if capped > 0 {
                    report.outliers_capped += capped;
                    report.actions.push(format!(
                        "Capped {capped} outliers in column '{name}' to median value."
                    ));
                }
            });
            tracing::info!(capped = report.outliers_capped, "outliers capped");
        }

        if self.settings.normalize {
            raw.map_columns(|name, values| {
                if let Some((min, max)) = min_max_scale(values) {
                    report.scales.push(ColumnScale {
                        column: name.to_string(),
                        min,
                        max,
                    });
                }
            });
            tracing::info!(columns = report.scales.len(), "min-max normalisation applied");
            report
                .actions
                .push("Applied min-max normalisation.".to_string());
        }

        report.rows_out = raw.row_count();

        if let Some(ref log) = self.audit {
            log.record_duplicates_removed(report.duplicates_removed as u64);
            log.record_values_interpolated(report.values_interpolated as u64);
            log.record_outliers_capped(report.outliers_capped as u64);
        }

        let table = raw.into_table()?;
        Ok((table, report))
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::create_shared_log;
    use crate::table::{parse_csv, parse_timestamp};

    const HERD_CSV: &str = "date,6774,6775,Group mean\n\
                            2024-03-01,10,20,15\n\
                            2024-03-02,,22,16\n\
                            2024-03-02,,22,16\n\
                            2024-03-03,14,24,19\n\
                            2024-03-04,16,26,21\n";

    #[test]
    fn test_full_run() {
        let log = create_shared_log();
        let raw = parse_csv(HERD_CSV).unwrap();
        let (table, report) = Preprocessor::default()
            .with_audit_log(log.clone())
            .run(raw)
            .unwrap();

        assert_eq!(report.rows_in, 5);
        assert_eq!(report.rows_out, 4);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.values_interpolated, 1);
        assert_eq!(report.scales.len(), 3);
        assert_eq!(table.row_count(), 4);

        // 6774 becomes 10, 12, 14, 16 then scales to thirds.
        let column = table.column("6774").unwrap();
        assert!((column[1] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(column[3], 1.0);

        assert_eq!(log.stats().duplicates_removed, 1);
        assert_eq!(log.stats().values_interpolated, 1);
    }

    #[test]
    fn test_steps_can_be_disabled() {
        let raw = parse_csv("date,a\n2024-03-01,1\n2024-03-02,3\n").unwrap();
        let settings = PreprocessSettings {
            normalize: false,
            ..Default::default()
        };
        let (table, report) = Preprocessor::new(settings).run(raw).unwrap();
        assert!(report.scales.is_empty());
        assert_eq!(table.column("a").unwrap().to_vec(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_conflicting_timestamps_rejected() {
        let raw = parse_csv("date,a\n2024-03-01,1\n2024-03-01,2\n").unwrap();
        let err = Preprocessor::default().run(raw).unwrap_err();
        assert!(matches!(err, TableError::DuplicateTimestamp { row: 1, .. }));
    }

    #[test]
    fn test_ragged_raw_table_rejected() {
        let raw = RawTable {
            columns: vec!["6774".to_string(), "6775".to_string()],
            timestamps: vec![
                parse_timestamp("2024-03-01").unwrap(),
                parse_timestamp("2024-03-02").unwrap(),
            ],
            rows: vec![vec![1.0, f64::NAN], vec![2.0]],
        };
        let err = Preprocessor::default().run(raw).unwrap_err();
        assert_eq!(
            err,
            TableError::ColumnMismatch {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }
}

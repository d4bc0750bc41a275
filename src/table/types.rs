//! Strongly-typed time series tables.
//!
//! A table keeps its timestamp column apart from the numeric payload so
//! nothing downstream addresses dates by column position.

use chrono::NaiveDateTime;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use std::collections::HashSet;

/// Timestamp of a single table row.
pub type Timestamp = NaiveDateTime;

/// Format used when timestamps are written back out.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A validated time series: chronological rows over a fixed set of named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    columns: Vec<String>,
    timestamps: Vec<Timestamp>,
    values: Array2<f64>,
}

impl TimeSeriesTable {
    /// Build a table from a timestamp column and a `(rows, columns)` value matrix.
    ///
    /// Fails when the shapes disagree, column names repeat, or timestamps are
    /// not strictly increasing.
    pub fn new(
        columns: Vec<String>,
        timestamps: Vec<Timestamp>,
        values: Array2<f64>,
    ) -> Result<Self, TableError> {
        if columns.is_empty() {
            return Err(TableError::NoColumns);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }

        if values.nrows() != timestamps.len() {
            return Err(TableError::LengthMismatch {
                timestamps: timestamps.len(),
                rows: values.nrows(),
            });
        }
        if values.ncols() != columns.len() {
            return Err(TableError::ColumnMismatch {
                row: 0,
                expected: columns.len(),
                actual: values.ncols(),
            });
        }

        for (row, pair) in timestamps.windows(2).enumerate() {
            if pair[1] == pair[0] {
                return Err(TableError::DuplicateTimestamp {
                    row: row + 1,
                    timestamp: pair[1],
                });
            }
            if pair[1] < pair[0] {
                return Err(TableError::NonChronological { row: row + 1 });
            }
        }

        Ok(Self {
            columns,
            timestamps,
            values,
        })
    }

    /// Build a table from `(timestamp, values)` rows.
    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<(Timestamp, Vec<f64>)>,
    ) -> Result<Self, TableError> {
        let width = columns.len();
        let mut timestamps = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * width);

        for (row, (timestamp, values)) in rows.into_iter().enumerate() {
            if values.len() != width {
                return Err(TableError::ColumnMismatch {
                    row,
                    expected: width,
                    actual: values.len(),
                });
            }
            timestamps.push(timestamp);
            flat.extend(values);
        }

        let values = Array2::from_shape_vec((timestamps.len(), width), flat)
            .map_err(|e| TableError::Shape(e.to_string()))?;
        Self::new(columns, timestamps, values)
    }

    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// The numeric payload, shaped `(rows, columns)`.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Values of a single row.
    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.row_count()).then(|| self.values.row(index))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of a named column.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.values.column(i))
    }

    /// Copy the named columns, in the given order, into a new table.
    pub fn select_columns(&self, names: &[&str]) -> Result<Self, TableError> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let values = self.values.select(Axis(1), &indices);
        Self::new(
            names.iter().map(|n| n.to_string()).collect(),
            self.timestamps.clone(),
            values,
        )
    }
}

/// A table as read from disk, before cleaning.
///
/// Missing cells are `NaN`. Rows may repeat and timestamps may be unordered;
/// [`RawTable::into_table`] enforces the [`TimeSeriesTable`] invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub timestamps: Vec<Timestamp>,
    pub rows: Vec<Vec<f64>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            timestamps: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Append a row, rejecting it if its width differs from the header.
    pub fn push_row(&mut self, timestamp: Timestamp, values: Vec<f64>) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::ColumnMismatch {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        self.timestamps.push(timestamp);
        self.rows.push(values);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of missing cells across the whole table.
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|v| v.is_nan())
            .count()
    }

    /// Copy out a single column.
    pub fn column_values(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// Overwrite a single column.
    pub fn set_column(&mut self, index: usize, values: &[f64]) {
        for (row, &value) in self.rows.iter_mut().zip(values) {
            row[index] = value;
        }
    }

    /// Apply `f` to every column in turn, passing its name and values.
    pub fn map_columns<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &mut [f64]),
    {
        for index in 0..self.columns.len() {
            let mut values = self.column_values(index);
            f(&self.columns[index], &mut values);
            self.set_column(index, &values);
        }
    }

    /// Check that there is one timestamp per row and every row matches the
    /// header width.
    ///
    /// The fields are public, so a table built by hand can break what
    /// [`RawTable::push_row`] enforces.
    pub fn check_shape(&self) -> Result<(), TableError> {
        if self.timestamps.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                timestamps: self.timestamps.len(),
                rows: self.rows.len(),
            });
        }
        let expected = self.columns.len();
        match self.rows.iter().position(|r| r.len() != expected) {
            Some(row) => Err(TableError::ColumnMismatch {
                row,
                expected,
                actual: self.rows[row].len(),
            }),
            None => Ok(()),
        }
    }

    /// Validate and convert into a [`TimeSeriesTable`].
    pub fn into_table(self) -> Result<TimeSeriesTable, TableError> {
        self.check_shape()?;
        let rows = self.timestamps.into_iter().zip(self.rows).collect();
        TimeSeriesTable::from_rows(self.columns, rows)
    }
}

/// Errors raised while building or reading tables.
#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    NoColumns,
    DuplicateColumn(String),
    UnknownColumn(String),
    ColumnMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    LengthMismatch {
        timestamps: usize,
        rows: usize,
    },
    DuplicateTimestamp {
        row: usize,
        timestamp: Timestamp,
    },
    NonChronological {
        row: usize,
    },
    Timestamp {
        row: usize,
        value: String,
    },
    Value {
        row: usize,
        column: String,
        value: String,
    },
    InvalidCowId(String),
    Shape(String),
    Io(String),
    Csv(String),
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::NoColumns => write!(f, "Table has no value columns"),
            TableError::DuplicateColumn(name) => write!(f, "Duplicate column '{name}'"),
            TableError::UnknownColumn(name) => write!(f, "Unknown column '{name}'"),
            TableError::ColumnMismatch {
                row,
                expected,
                actual,
            } => write!(
                f,
                "Row {row} has {actual} values but the table has {expected} columns"
            ),
            TableError::LengthMismatch { timestamps, rows } => write!(
                f,
                "{timestamps} timestamps supplied for {rows} rows of values"
            ),
            TableError::DuplicateTimestamp { row, timestamp } => write!(
                f,
                "Row {row} repeats timestamp {}",
                timestamp.format(TIMESTAMP_FORMAT)
            ),
            TableError::NonChronological { row } => {
                write!(f, "Row {row} is earlier than the row before it")
            }
            TableError::Timestamp { row, value } => {
                write!(f, "Row {row}: cannot parse timestamp '{value}'")
            }
            TableError::Value { row, column, value } => {
                write!(f, "Row {row}, column '{column}': '{value}' is not numeric")
            }
            TableError::InvalidCowId(id) => {
                write!(f, "Invalid cow ID '{id}': expected 1 to 4 digits")
            }
            TableError::Shape(e) => write!(f, "Shape error: {e}"),
            TableError::Io(e) => write!(f, "IO error: {e}"),
            TableError::Csv(e) => write!(f, "CSV error: {e}"),
        }
    }
}

impl std::error::Error for TableError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn columns() -> Vec<String> {
        vec!["6774".to_string(), "Group mean".to_string()]
    }

    #[test]
    fn test_from_rows_builds_table() {
        let table = TimeSeriesTable::from_rows(
            columns(),
            vec![(day(1), vec![1.0, 2.0]), (day(2), vec![3.0, 4.0])],
        )
        .unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.values()[[1, 0]], 3.0);
        assert_eq!(table.column("Group mean").unwrap().to_vec(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_inconsistent_row_width_rejected() {
        let err = TimeSeriesTable::from_rows(
            columns(),
            vec![(day(1), vec![1.0, 2.0]), (day(2), vec![3.0])],
        )
        .unwrap_err();

        assert_eq!(
            err,
            TableError::ColumnMismatch {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_timestamps_must_increase() {
        let err = TimeSeriesTable::from_rows(
            columns(),
            vec![(day(2), vec![1.0, 2.0]), (day(1), vec![3.0, 4.0])],
        )
        .unwrap_err();
        assert_eq!(err, TableError::NonChronological { row: 1 });

        let err = TimeSeriesTable::from_rows(
            columns(),
            vec![(day(1), vec![1.0, 2.0]), (day(1), vec![3.0, 4.0])],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::DuplicateTimestamp { row: 1, .. }));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = TimeSeriesTable::from_rows(
            vec!["a".to_string(), "a".to_string()],
            vec![(day(1), vec![1.0, 2.0])],
        )
        .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn test_select_columns_reorders() {
        let table = TimeSeriesTable::from_rows(
            columns(),
            vec![(day(1), vec![1.0, 2.0]), (day(2), vec![3.0, 4.0])],
        )
        .unwrap();

        let selected = table.select_columns(&["Group mean", "6774"]).unwrap();
        assert_eq!(selected.columns(), &["Group mean", "6774"]);
        assert_eq!(selected.row(0).unwrap().to_vec(), vec![2.0, 1.0]);

        let err = table.select_columns(&["6775"]).unwrap_err();
        assert_eq!(err, TableError::UnknownColumn("6775".to_string()));
    }

    #[test]
    fn test_raw_table_map_columns() {
        let mut raw = RawTable::new(columns());
        raw.push_row(day(1), vec![1.0, f64::NAN]).unwrap();
        raw.push_row(day(2), vec![2.0, 4.0]).unwrap();
        assert_eq!(raw.missing_count(), 1);

        raw.map_columns(|_, values| {
            for v in values.iter_mut() {
                *v *= 10.0;
            }
        });
        assert_eq!(raw.column_values(0), vec![10.0, 20.0]);
        assert!(raw.push_row(day(3), vec![1.0]).is_err());
    }

    #[test]
    fn test_hand_built_raw_table_shape_checked() {
        let ragged = RawTable {
            columns: columns(),
            timestamps: vec![day(1), day(2)],
            rows: vec![vec![1.0, f64::NAN], vec![2.0]],
        };
        assert_eq!(
            ragged.check_shape().unwrap_err(),
            TableError::ColumnMismatch {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
        assert!(ragged.into_table().is_err());

        let short = RawTable {
            columns: columns(),
            timestamps: vec![day(1)],
            rows: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        };
        assert_eq!(
            short.into_table().unwrap_err(),
            TableError::LengthMismatch {
                timestamps: 1,
                rows: 2
            }
        );
    }
}

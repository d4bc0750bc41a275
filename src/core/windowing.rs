//! Sliding-window sequence construction.
//!
//! A window of `length` consecutive rows is paired with the row that follows
//! it, which serves as the prediction target. Windows start at every row
//! index from 0 up to `row_count - length - 1`, in increasing order.

use crate::core::split::split_index;
use crate::core::SequenceError;
use crate::table::{TimeSeriesTable, Timestamp, TIMESTAMP_FORMAT};
use ndarray::{s, Array1, Array2, Array3, Axis};

/// One input window and its next-step target.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceWindow {
    /// Index of the first row of the window in the source table
    pub start: usize,
    /// Window values, shaped `(length, columns)`
    pub values: Array2<f64>,
    /// Values of the row following the window, shaped `(columns,)`
    pub target: Array1<f64>,
    /// Timestamps of the window rows
    pub timestamps: Vec<Timestamp>,
    /// Timestamp of the target row
    pub target_timestamp: Timestamp,
}

impl SequenceWindow {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// All windows built from one table with one sequence length.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    length: usize,
    columns: Vec<String>,
    windows: Vec<SequenceWindow>,
}

impl WindowSet {
    /// Sequence length shared by every window.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn windows(&self) -> &[SequenceWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SequenceWindow> {
        self.windows.iter()
    }

    /// Stack windows and targets into `(n, length, columns)` and `(n, columns)` arrays.
    pub fn to_arrays(&self) -> (Array3<f64>, Array2<f64>) {
        let n = self.windows.len();
        let width = self.columns.len();
        let mut x = Array3::<f64>::zeros((n, self.length, width));
        let mut y = Array2::<f64>::zeros((n, width));

        for (i, window) in self.windows.iter().enumerate() {
            x.index_axis_mut(Axis(0), i).assign(&window.values);
            y.row_mut(i).assign(&window.target);
        }

        (x, y)
    }

    /// Window timestamps rendered as strings, one list per window.
    pub fn timestamp_lists(&self) -> Vec<Vec<String>> {
        self.windows
            .iter()
            .map(|w| {
                w.timestamps
                    .iter()
                    .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                    .collect()
            })
            .collect()
    }

    /// Split windows into leading training and trailing test portions.
    pub fn split(
        &self,
        test_size: f64,
    ) -> Result<(&[SequenceWindow], &[SequenceWindow]), SequenceError> {
        let index = split_index(self.windows.len(), test_size)?;
        Ok(self.windows.split_at(index))
    }
}

impl<'a> IntoIterator for &'a WindowSet {
    type Item = &'a SequenceWindow;
    type IntoIter = std::slice::Iter<'a, SequenceWindow>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.iter()
    }
}

/// Slide a window of `length` rows across `table`.
///
/// Returns `row_count - length` windows, or none when `length >= row_count`.
/// A zero length is rejected.
pub fn make_windows(table: &TimeSeriesTable, length: usize) -> Result<WindowSet, SequenceError> {
    if length == 0 {
        return Err(SequenceError::InvalidInput(
            "sequence length must be at least 1".to_string(),
        ));
    }

    let count = table.row_count().saturating_sub(length);
    let values = table.values();
    let timestamps = table.timestamps();

    let windows = (0..count)
        .map(|i| SequenceWindow {
            start: i,
            values: values.slice(s![i..i + length, ..]).to_owned(),
            target: values.row(i + length).to_owned(),
            timestamps: timestamps[i..i + length].to_vec(),
            target_timestamp: timestamps[i + length],
        })
        .collect();

    Ok(WindowSet {
        length,
        columns: table.columns().to_vec(),
        windows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn table(rows: usize, columns: usize) -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let names = (0..columns).map(|c| format!("{}", 6774 + c)).collect();
        let data = (0..rows)
            .map(|r| {
                let values = (0..columns).map(|c| (r * 10 + c) as f64).collect();
                (start + Duration::days(r as i64), values)
            })
            .collect();
        TimeSeriesTable::from_rows(names, data).unwrap()
    }

    #[test]
    fn test_twelve_rows_length_ten() {
        let table = table(12, 3);
        let set = make_windows(&table, 10).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.windows()[0].start, 0);
        assert_eq!(set.windows()[1].start, 1);
        assert_eq!(set.windows()[1].target.to_vec(), vec![110.0, 111.0, 112.0]);
    }

    #[test]
    fn test_window_count_and_shapes() {
        let table = table(20, 4);
        for length in 1..25 {
            let set = make_windows(&table, length).unwrap();
            assert_eq!(set.len(), 20usize.saturating_sub(length));
            for window in &set {
                assert_eq!(window.values.shape(), &[length, 4]);
                assert_eq!(window.target.shape(), &[4]);
                assert_eq!(window.timestamps.len(), length);
            }
        }
    }

    #[test]
    fn test_windows_follow_table_order() {
        let table = table(15, 2);
        let set = make_windows(&table, 5).unwrap();

        for (i, window) in set.iter().enumerate() {
            assert_eq!(window.start, i);

            let mut stamps = window.timestamps.clone();
            stamps.push(window.target_timestamp);
            assert_eq!(stamps.as_slice(), &table.timestamps()[i..i + 6]);

            assert_eq!(window.values.row(0), table.row(i).unwrap());
            assert_eq!(window.target.view(), table.row(i + 5).unwrap());
        }
    }

    #[test]
    fn test_length_not_below_row_count_is_empty() {
        let table = table(5, 2);
        assert!(make_windows(&table, 5).unwrap().is_empty());
        assert!(make_windows(&table, 9).unwrap().is_empty());
    }

    #[test]
    fn test_zero_length_rejected() {
        let table = table(5, 2);
        assert!(matches!(
            make_windows(&table, 0),
            Err(SequenceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deterministic_and_input_untouched() {
        let table = table(10, 2);
        let before = table.clone();
        let a = make_windows(&table, 3).unwrap();
        let b = make_windows(&table, 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(table, before);
    }

    #[test]
    fn test_to_arrays() {
        let table = table(8, 2);
        let set = make_windows(&table, 3).unwrap();
        let (x, y) = set.to_arrays();

        assert_eq!(x.shape(), &[5, 3, 2]);
        assert_eq!(y.shape(), &[5, 2]);
        assert_eq!(x[[2, 0, 1]], 21.0);
        assert_eq!(y[[4, 0]], 70.0);
    }

    #[test]
    fn test_split_windows() {
        let table = table(15, 1);
        let set = make_windows(&table, 5).unwrap();
        let (train, test) = set.split(0.2).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        assert_eq!(test[0].start, 8);
    }
}

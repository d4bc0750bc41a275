//! Exact-duplicate row removal.

use crate::table::{RawTable, Timestamp};
use std::collections::HashSet;

/// Drop rows identical to an earlier row in timestamp and every value.
///
/// Returns the number of rows removed. The first occurrence is kept and row
/// order is otherwise preserved.
pub fn remove_duplicates(raw: &mut RawTable) -> usize {
    let before = raw.row_count();
    let mut seen: HashSet<(Timestamp, Vec<u64>)> = HashSet::with_capacity(before);

    let timestamps = std::mem::take(&mut raw.timestamps);
    let rows = std::mem::take(&mut raw.rows);
    for (timestamp, row) in timestamps.into_iter().zip(rows) {
        let bits = row.iter().map(|&v| value_key(v)).collect();
        if seen.insert((timestamp, bits)) {
            raw.timestamps.push(timestamp);
            raw.rows.push(row);
        }
    }

    before - raw.row_count()
}

/// Bit pattern used to compare cells: `-0.0` matches `0.0` and every `NaN`
/// matches every other.
fn value_key(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_timestamp;

    fn raw(rows: &[(&str, f64)]) -> RawTable {
        let mut raw = RawTable::new(vec!["6774".to_string()]);
        for (day, v) in rows {
            raw.push_row(parse_timestamp(day).unwrap(), vec![*v]).unwrap();
        }
        raw
    }

    #[test]
    fn test_exact_duplicates_removed() {
        let mut table = raw(&[
            ("2024-03-01", 1.0),
            ("2024-03-02", 2.0),
            ("2024-03-01", 1.0),
            ("2024-03-03", 3.0),
            ("2024-03-02", 2.0),
        ]);

        assert_eq!(remove_duplicates(&mut table), 2);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_values(0), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_same_timestamp_different_values_kept() {
        let mut table = raw(&[("2024-03-01", 1.0), ("2024-03-01", 1.5)]);
        assert_eq!(remove_duplicates(&mut table), 0);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_signed_zero_rows_are_duplicates() {
        let mut table = raw(&[("2024-03-01", 0.0), ("2024-03-01", -0.0)]);
        assert_eq!(remove_duplicates(&mut table), 1);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_missing_values_compare_equal() {
        let mut table = raw(&[("2024-03-01", f64::NAN), ("2024-03-01", f64::NAN)]);
        assert_eq!(remove_duplicates(&mut table), 1);
    }
}

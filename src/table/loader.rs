//! CSV input and output for herd sensor tables.
//!
//! The first CSV column always holds timestamps and is renamed to `date`
//! regardless of its header. Every other column is a numeric series.

use crate::table::types::{RawTable, TableError, TimeSeriesTable, Timestamp, TIMESTAMP_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim, Writer};
use std::path::Path;

/// Name given to the timestamp column.
pub const TIMESTAMP_COLUMN: &str = "date";

/// Date-time layouts accepted for the timestamp column, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Date-only layouts; these map to midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Cell contents treated as missing.
const MISSING_MARKERS: &[&str] = &["", "nan", "na", "n/a", "null"];

/// Load a CSV file into a [`RawTable`].
///
/// The file is decoded as UTF-8, falling back to ISO-8859-1 when it is not
/// valid UTF-8.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<RawTable, TableError> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| TableError::Io(e.to_string()))?;
    let text = decode_text(bytes);
    let raw = parse_csv(&text)?;

    tracing::debug!(
        path = %path.as_ref().display(),
        rows = raw.row_count(),
        columns = raw.columns.len(),
        "loaded table"
    );
    Ok(raw)
}

/// Decode file bytes as UTF-8, or as ISO-8859-1 if that fails.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("input is not valid UTF-8, decoding as ISO-8859-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

/// Parse CSV text into a [`RawTable`].
pub fn parse_csv(text: &str) -> Result<RawTable, TableError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| TableError::Csv(e.to_string()))?
        .clone();
    if headers.len() < 2 {
        return Err(TableError::NoColumns);
    }

    let columns: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();
    let mut raw = RawTable::new(columns);

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| TableError::Csv(e.to_string()))?;
        if record.len() != headers.len() {
            return Err(TableError::ColumnMismatch {
                row,
                expected: raw.columns.len(),
                actual: record.len().saturating_sub(1),
            });
        }

        let stamp = &record[0];
        let timestamp = parse_timestamp(stamp).ok_or_else(|| TableError::Timestamp {
            row,
            value: stamp.to_string(),
        })?;

        let values = record
            .iter()
            .skip(1)
            .zip(&raw.columns)
            .map(|(cell, column)| {
                parse_value(cell).ok_or_else(|| TableError::Value {
                    row,
                    column: column.clone(),
                    value: cell.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        raw.push_row(timestamp, values)?;
    }

    Ok(raw)
}

/// Parse a timestamp cell.
pub fn parse_timestamp(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parse a value cell; missing markers become `NaN`.
fn parse_value(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if MISSING_MARKERS
        .iter()
        .any(|marker| cell.eq_ignore_ascii_case(marker))
    {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

/// Write a table to CSV with a leading `date` column.
pub fn write_csv<P: AsRef<Path>>(table: &TimeSeriesTable, path: P) -> Result<(), TableError> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| TableError::Io(e.to_string()))?;
    }

    let mut writer = Writer::from_path(path.as_ref()).map_err(|e| TableError::Csv(e.to_string()))?;

    let mut header = vec![TIMESTAMP_COLUMN.to_string()];
    header.extend(table.columns().iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| TableError::Csv(e.to_string()))?;

    for (timestamp, row) in table.timestamps().iter().zip(table.values().rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(timestamp.format(TIMESTAMP_FORMAT).to_string());
        record.extend(row.iter().map(|v| v.to_string()));
        writer
            .write_record(&record)
            .map_err(|e| TableError::Csv(e.to_string()))?;
    }

    writer.flush().map_err(|e| TableError::Io(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Unnamed: 0, 6774 ,6775,Group mean\n\
                          2024-03-01,1.5,2.0,1.75\n\
                          2024-03-02,,3.0,3.0\n\
                          2024-03-03,2.5,NaN,2.5\n";

    #[test]
    fn test_parse_csv_normalises_header() {
        let raw = parse_csv(SAMPLE).unwrap();
        assert_eq!(raw.columns, vec!["6774", "6775", "Group mean"]);
        assert_eq!(raw.row_count(), 3);
        assert_eq!(raw.rows[0], vec![1.5, 2.0, 1.75]);
        assert!(raw.rows[1][0].is_nan());
        assert!(raw.rows[2][1].is_nan());
        assert_eq!(raw.missing_count(), 2);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(midnight.format(TIMESTAMP_FORMAT).to_string(), "2024-03-01 00:00:00");

        let with_time = parse_timestamp("01/03/2024 06:30").unwrap();
        assert_eq!(with_time.format(TIMESTAMP_FORMAT).to_string(), "2024-03-01 06:30:00");

        assert!(parse_timestamp("2024-03-01T12:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_short_row_rejected() {
        let err = parse_csv("date,a,b\n2024-03-01,1.0\n").unwrap_err();
        assert_eq!(
            err,
            TableError::ColumnMismatch {
                row: 0,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let err = parse_csv("date,a\n2024-03-01,high\n").unwrap_err();
        assert!(matches!(err, TableError::Value { row: 0, .. }));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let err = parse_csv("date,a\nnot-a-date,1.0\n").unwrap_err();
        assert!(matches!(err, TableError::Timestamp { row: 0, .. }));
    }

    #[test]
    fn test_latin1_fallback() {
        // 0xB0 is the degree sign in ISO-8859-1 and invalid as UTF-8 here.
        let bytes = b"date,temp \xb0C\n2024-03-01,38.5\n".to_vec();
        let text = decode_text(bytes);
        let raw = parse_csv(&text).unwrap();
        assert_eq!(raw.columns, vec!["temp \u{b0}C"]);
    }
}

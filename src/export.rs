//! NumPy export of window sets.
//!
//! An export directory holds:
//! - `X.npy`: windows, `(n, length, columns)` `f64`
//! - `y.npy`: targets, `(n, columns)` `f64`
//! - `sequence_dates.json`: per-window timestamp lists
//! - `metadata.json`: [`ExportMetadata`]

use crate::core::WindowSet;
use ndarray::{Array2, Array3, Axis};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const WINDOWS_FILE: &str = "X.npy";
pub const TARGETS_FILE: &str = "y.npy";
pub const DATES_FILE: &str = "sequence_dates.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Description of an exported window set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub run_id: String,
    pub producer_version: String,
    pub sequence_length: usize,
    pub n_windows: usize,
    pub columns: Vec<String>,
    pub exported_at: String,
}

/// Where and what an export wrote.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub dir: PathBuf,
    pub metadata: ExportMetadata,
}

/// A previously exported window set read back from disk.
#[derive(Debug, Clone)]
pub struct ExportedDataset {
    pub x: Array3<f64>,
    pub y: Array2<f64>,
    pub dates: Vec<Vec<String>>,
    pub metadata: ExportMetadata,
}

/// Write `set` into `dir`, creating it if needed.
pub fn export_windows<P: AsRef<Path>>(set: &WindowSet, dir: P) -> Result<ExportSummary, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| ExportError::Io(e.to_string()))?;

    let (x, y) = set.to_arrays();
    write_array(&x, &dir.join(WINDOWS_FILE))?;
    write_array(&y, &dir.join(TARGETS_FILE))?;
    write_json(&set.timestamp_lists(), &dir.join(DATES_FILE))?;

    let metadata = ExportMetadata {
        run_id: Uuid::new_v4().to_string(),
        producer_version: crate::VERSION.to_string(),
        sequence_length: set.length(),
        n_windows: set.len(),
        columns: set.columns().to_vec(),
        exported_at: chrono::Utc::now().to_rfc3339(),
    };
    write_json(&metadata, &dir.join(METADATA_FILE))?;

    tracing::info!(
        dir = %dir.display(),
        windows = set.len(),
        length = set.length(),
        "exported window set"
    );

    Ok(ExportSummary {
        dir: dir.to_path_buf(),
        metadata,
    })
}

/// Read an export directory written by [`export_windows`].
pub fn load_exported<P: AsRef<Path>>(dir: P) -> Result<ExportedDataset, ExportError> {
    let dir = dir.as_ref();

    let x = Array3::<f64>::read_npy(open(&dir.join(WINDOWS_FILE))?)
        .map_err(|e| ExportError::Npy(e.to_string()))?;
    let y = Array2::<f64>::read_npy(open(&dir.join(TARGETS_FILE))?)
        .map_err(|e| ExportError::Npy(e.to_string()))?;
    let dates: Vec<Vec<String>> = read_json(&dir.join(DATES_FILE))?;
    let metadata: ExportMetadata = read_json(&dir.join(METADATA_FILE))?;

    let n = x.len_of(Axis(0));
    if y.nrows() != n || dates.len() != n {
        return Err(ExportError::Shape(format!(
            "{n} windows, {} targets, {} date lists",
            y.nrows(),
            dates.len()
        )));
    }

    Ok(ExportedDataset {
        x,
        y,
        dates,
        metadata,
    })
}

fn open(path: &Path) -> Result<BufReader<File>, ExportError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ExportError::Io(format!("{}: {e}", path.display())))
}

fn write_array<A: WriteNpyExt>(array: &A, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::Io(e.to_string()))?;
    array
        .write_npy(BufWriter::new(file))
        .map_err(|e| ExportError::Npy(format!("{}: {e}", path.display())))
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::Io(e.to_string()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| ExportError::Serialize(e.to_string()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ExportError> {
    serde_json::from_reader(open(path)?).map_err(|e| ExportError::Serialize(e.to_string()))
}

/// Export errors.
#[derive(Debug)]
pub enum ExportError {
    Io(String),
    Npy(String),
    Serialize(String),
    Shape(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "IO error: {e}"),
            ExportError::Npy(e) => write!(f, "NumPy error: {e}"),
            ExportError::Serialize(e) => write!(f, "Serialize error: {e}"),
            ExportError::Shape(e) => write!(f, "Shape mismatch: {e}"),
        }
    }
}

impl std::error::Error for ExportError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::make_windows;
    use crate::table::TimeSeriesTable;
    use chrono::{Duration, NaiveDate};
    use tempfile::TempDir;

    fn window_set() -> WindowSet {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let rows = (0..9)
            .map(|i| (start + Duration::hours(i), vec![i as f64, 0.5 * i as f64]))
            .collect();
        let table =
            TimeSeriesTable::from_rows(vec!["6774".to_string(), "Group mean".to_string()], rows)
                .unwrap();
        make_windows(&table, 4).unwrap()
    }

    #[test]
    fn test_export_and_reload() {
        let dir = TempDir::new().unwrap();
        let set = window_set();

        let summary = export_windows(&set, dir.path()).unwrap();
        assert_eq!(summary.metadata.n_windows, 5);
        assert_eq!(summary.metadata.sequence_length, 4);

        let loaded = load_exported(dir.path()).unwrap();
        assert_eq!(loaded.x.shape(), &[5, 4, 2]);
        assert_eq!(loaded.y.shape(), &[5, 2]);
        assert_eq!(loaded.y[[0, 0]], 4.0);
        assert_eq!(loaded.dates[1][0], "2024-05-01 07:00:00");
        assert_eq!(loaded.metadata, summary.metadata);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let err = load_exported(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}

//! Time series tables for the herd sequencer.
//!
//! This module provides the typed table the sequencing core consumes,
//! the raw table produced by the CSV loader, and CSV input/output.

pub mod loader;
pub mod types;

// Re-export commonly used types
pub use loader::{load_csv, parse_csv, parse_timestamp, write_csv, TIMESTAMP_COLUMN};
pub use types::{RawTable, TableError, TimeSeriesTable, Timestamp, TIMESTAMP_FORMAT};

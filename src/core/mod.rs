//! Core sequencing functionality.
//!
//! This module contains:
//! - Sequence length selection from the size of a table
//! - Sliding-window construction of (window, target, timestamps) triples
//! - Temporal train/test splitting of the result

pub mod length;
pub mod split;
pub mod windowing;

use crate::table::TableError;

// Re-export commonly used types
pub use length::{select_length, LengthBounds, LengthSelection};
pub use split::{split_arrays, split_index, ArraySplit};
pub use windowing::{make_windows, SequenceWindow, WindowSet};

/// Errors raised by the sequencing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceError {
    InvalidInput(String),
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceError::InvalidInput(e) => write!(f, "Invalid input: {e}"),
        }
    }
}

impl std::error::Error for SequenceError {}

impl From<TableError> for SequenceError {
    fn from(e: TableError) -> Self {
        SequenceError::InvalidInput(e.to_string())
    }
}

//! Sequence length selection.
//!
//! The window length is the integer square root of the row count, clamped
//! into bounds that scale with the size of the table.

use crate::core::SequenceError;
use serde::{Deserialize, Serialize};

/// Parameters bounding the selected sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthBounds {
    /// Fraction of the row count used for the dynamic lower bound
    pub min_proportion: f64,
    /// Fraction of the row count used for the dynamic upper bound
    pub max_proportion: f64,
    /// Absolute floor for the lower bound
    pub min_length: usize,
    /// Absolute ceiling for the upper bound
    pub max_length: usize,
}

impl Default for LengthBounds {
    fn default() -> Self {
        Self {
            min_proportion: 0.1,
            max_proportion: 0.5,
            min_length: 5,
            max_length: 30,
        }
    }
}

/// The outcome of a length selection, with the intermediate values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthSelection {
    pub row_count: usize,
    /// Integer square root of the row count
    pub candidate: usize,
    /// `max(min_length, floor(rows * min_proportion))`
    pub lower: usize,
    /// `min(max_length, floor(rows * max_proportion))`
    pub upper: usize,
    /// The selected length
    pub length: usize,
    /// Whether `lower > upper` and the fallback applied
    pub degenerate: bool,
    /// Whether the row-count cap lowered the result, possibly below `lower`
    pub capped: bool,
}

impl LengthBounds {
    /// Check that the parameters describe usable bounds.
    pub fn validate(&self) -> Result<(), SequenceError> {
        for (name, p) in [
            ("min_proportion", self.min_proportion),
            ("max_proportion", self.max_proportion),
        ] {
            if !p.is_finite() || p <= 0.0 || p > 1.0 {
                return Err(SequenceError::InvalidInput(format!(
                    "{name} must be within (0, 1], got {p}"
                )));
            }
        }
        if self.min_length == 0 || self.max_length == 0 {
            return Err(SequenceError::InvalidInput(
                "min_length and max_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Select a sequence length for a table of `row_count` rows.
    ///
    /// When the dynamic lower bound exceeds the upper bound the lower bound
    /// wins. Every result is then capped to `[1, max(1, row_count - 1)]` so a
    /// table of two or more rows always yields at least one window. When that
    /// cap changes the result, `capped` is set and `length` may fall below
    /// `lower`.
    pub fn resolve(&self, row_count: usize) -> Result<LengthSelection, SequenceError> {
        if row_count == 0 {
            return Err(SequenceError::InvalidInput(
                "row count must be positive".to_string(),
            ));
        }
        self.validate()?;

        let candidate = integer_sqrt(row_count);
        let lower = self
            .min_length
            .max(proportion_of(row_count, self.min_proportion));
        let upper = self
            .max_length
            .min(proportion_of(row_count, self.max_proportion));

        let degenerate = lower > upper;
        let bounded = if degenerate {
            lower
        } else {
            candidate.clamp(lower, upper)
        };
        let ceiling = row_count.saturating_sub(1).max(1);
        let length = bounded.clamp(1, ceiling);
        let capped = length != bounded;

        if degenerate {
            tracing::debug!(row_count, lower, upper, length, "length bounds crossed");
        }
        if capped {
            tracing::debug!(row_count, bounded, length, "length capped by row count");
        }

        Ok(LengthSelection {
            row_count,
            candidate,
            lower,
            upper,
            length,
            degenerate,
            capped,
        })
    }

    /// Select a sequence length, discarding the intermediate values.
    pub fn select(&self, row_count: usize) -> Result<usize, SequenceError> {
        self.resolve(row_count).map(|s| s.length)
    }
}

/// Select a sequence length with explicit parameters.
pub fn select_length(
    row_count: usize,
    min_proportion: f64,
    max_proportion: f64,
    min_length: usize,
    max_length: usize,
) -> Result<usize, SequenceError> {
    LengthBounds {
        min_proportion,
        max_proportion,
        min_length,
        max_length,
    }
    .select(row_count)
}

fn proportion_of(row_count: usize, proportion: f64) -> usize {
    (row_count as f64 * proportion).floor() as usize
}

fn integer_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).map_or(false, |sq| sq <= n) {
        root += 1;
    }
    root
}

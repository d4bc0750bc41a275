//! Min-max normalisation.

use serde::{Deserialize, Serialize};

/// The range a column was scaled from, kept so values can be mapped back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

impl ColumnScale {
    /// Map a normalised value back to the original units.
    pub fn invert(&self, value: f64) -> f64 {
        value * (self.max - self.min) + self.min
    }
}

/// Scale one column into `[0, 1]` in place.
///
/// A constant column maps to 0. Missing values stay missing. Returns the
/// `(min, max)` of the column, or `None` when it holds no values.
pub fn min_max_scale(values: &mut [f64]) -> Option<(f64, f64)> {
    let (min, max) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

    let range = max - min;
    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        *v = if range > 0.0 { (*v - min) / range } else { 0.0 };
    }
    Some((min, max))
}

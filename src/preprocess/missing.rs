//! Missing-value interpolation.

use crate::table::RawTable;

/// Percentage of missing values above which a column is flagged for removal.
pub const REMOVAL_THRESHOLD_PCT: f64 = 30.0;

/// What interpolation did to a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingOutcome {
    /// Number of cells filled
    pub filled: usize,
    /// Human-readable actions taken
    pub actions: Vec<String>,
}

/// Fill missing cells in every column of `raw`.
pub fn interpolate_missing(raw: &mut RawTable) -> MissingOutcome {
    let mut outcome = MissingOutcome::default();
    let rows = raw.row_count();

    if raw.missing_count() == 0 {
        outcome
            .actions
            .push("No missing values found. No need for interpolation.".to_string());
        return outcome;
    }

    let worst_pct = (0..raw.columns.len())
        .map(|i| missing_pct(&raw.column_values(i), rows))
        .fold(0.0, f64::max);
    if worst_pct > REMOVAL_THRESHOLD_PCT {
        outcome.actions.push(format!(
            "Columns with more than {REMOVAL_THRESHOLD_PCT}% missing values found. \
             Consider removing these columns."
        ));
    }

    raw.map_columns(|name, values| {
        let missing = values.iter().filter(|v| v.is_nan()).count();
        if missing == 0 {
            return;
        }
        let filled = interpolate_column(values);
        if filled == 0 {
            outcome
                .actions
                .push(format!("Column '{name}' has no values to interpolate from."));
        } else {
            outcome
                .actions
                .push(format!("Interpolated {filled} missing values in column '{name}'."));
            outcome.filled += filled;
        }
    });

    outcome
}

fn missing_pct(values: &[f64], rows: usize) -> f64 {
    if rows == 0 {
        return 0.0;
    }
    values.iter().filter(|v| v.is_nan()).count() as f64 * 100.0 / rows as f64
}

/// Fill `NaN` entries of one column in place, returning how many were filled.
///
/// Interior gaps are filled linearly between their nearest valid neighbours.
/// Leading and trailing gaps copy the nearest valid value. A column with no
/// valid values is left untouched.
pub fn interpolate_column(values: &mut [f64]) -> usize {
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, _)| i)
        .collect();

    let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
        return 0;
    };

    let mut filled = 0;

    let head = values[first];
    for v in &mut values[..first] {
        *v = head;
        filled += 1;
    }

    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (from, to) = (values[a], values[b]);
        let span = (b - a) as f64;
        for i in a + 1..b {
            values[i] = from + (to - from) * (i - a) as f64 / span;
            filled += 1;
        }
    }

    let tail = values[last];
    for v in &mut values[last + 1..] {
        *v = tail;
        filled += 1;
    }

    filled
}

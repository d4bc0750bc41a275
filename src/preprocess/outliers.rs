//! Z-score outlier capping.

use statrs::statistics::{Data, Median, Statistics};

/// Absolute z-score above which a value counts as an outlier.
pub const Z_SCORE_THRESHOLD: f64 = 3.0;

/// Replace outliers in one column with the column median.
///
/// z-scores use the mean and sample standard deviation of the non-missing
/// values, computed once before any replacement. Missing values are skipped.
/// Returns the number of values replaced.
pub fn cap_outliers(values: &mut [f64]) -> usize {
    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.len() < 2 {
        return 0;
    }

    let mean = valid.iter().mean();
    let std_dev = valid.iter().std_dev();
    if !std_dev.is_finite() || std_dev == 0.0 {
        return 0;
    }
    let median = Data::new(valid).median();

    let mut capped = 0;
    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        if ((*v - mean) / std_dev).abs() > Z_SCORE_THRESHOLD {
            *v = median;
            capped += 1;
        }
    }
    capped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_spike_capped_to_median() {
        let mut values: Vec<f64> = (0..19).map(|i| 10.0 + (i % 3) as f64).collect();
        values.push(100.0);

        assert_eq!(cap_outliers(&mut values), 1);
        assert_eq!(values[19], 11.0);
        assert!(values.iter().all(|&v| v <= 12.0));
    }

    #[test]
    fn test_constant_column_untouched() {
        let mut values = vec![5.0; 10];
        assert_eq!(cap_outliers(&mut values), 0);
    }

    #[test]
    fn test_missing_values_skipped() {
        let mut values = vec![1.0, f64::NAN, 2.0, 3.0];
        assert_eq!(cap_outliers(&mut values), 0);
        assert!(values[1].is_nan());
    }
}

//! Temporal train/test splitting.
//!
//! Windows are never shuffled: the earliest portion trains, the rest tests.

use crate::core::SequenceError;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Train/test views over stacked window and target arrays.
#[derive(Debug)]
pub struct ArraySplit<'a> {
    pub x_train: ArrayView3<'a, f64>,
    pub x_test: ArrayView3<'a, f64>,
    pub y_train: ArrayView2<'a, f64>,
    pub y_test: ArrayView2<'a, f64>,
}

/// Index of the first test item: `floor(len * (1 - test_size))`.
pub fn split_index(len: usize, test_size: f64) -> Result<usize, SequenceError> {
    if !test_size.is_finite() || !(0.0..1.0).contains(&test_size) {
        return Err(SequenceError::InvalidInput(format!(
            "test_size must be within [0, 1), got {test_size}"
        )));
    }
    let index = (len as f64 * (1.0 - test_size)).floor() as usize;
    Ok(index.min(len))
}

/// Split stacked windows `x` and targets `y` along their first axis.
pub fn split_arrays<'a>(
    x: &'a Array3<f64>,
    y: &'a Array2<f64>,
    test_size: f64,
) -> Result<ArraySplit<'a>, SequenceError> {
    let n = x.len_of(Axis(0));
    if y.nrows() != n {
        return Err(SequenceError::InvalidInput(format!(
            "{n} windows but {} targets",
            y.nrows()
        )));
    }

    let index = split_index(n, test_size)?;
    Ok(ArraySplit {
        x_train: x.slice(s![..index, .., ..]),
        x_test: x.slice(s![index.., .., ..]),
        y_train: y.slice(s![..index, ..]),
        y_test: y.slice(s![index.., ..]),
    })
}

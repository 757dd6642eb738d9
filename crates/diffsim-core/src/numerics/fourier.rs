//! Two-dimensional discrete Fourier transforms and quadrant shifts.
//!
//! Conventions follow the usual numerical ones: the forward transform is
//! unnormalized and the inverse transform divides by the number of samples.

use ndarray::{Array2, ArrayViewMut1};
use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FourierDirection {
    Forward,
    Inverse,
}

impl FourierDirection {
    fn as_rustfft(self) -> FftDirection {
        match self {
            Self::Forward => FftDirection::Forward,
            Self::Inverse => FftDirection::Inverse,
        }
    }
}

pub fn transform2(field: &Array2<Complex64>, direction: FourierDirection) -> Array2<Complex64> {
    let (rows, cols) = field.dim();
    let mut output = field.clone();
    if rows == 0 || cols == 0 {
        return output;
    }

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft(cols, direction.as_rustfft());
    let mut buffer = vec![Complex64::new(0.0, 0.0); cols];
    for row in output.rows_mut() {
        transform_lane(row, row_fft.as_ref(), &mut buffer);
    }

    let column_fft: Arc<dyn Fft<f64>> = planner.plan_fft(rows, direction.as_rustfft());
    let mut buffer = vec![Complex64::new(0.0, 0.0); rows];
    for column in output.columns_mut() {
        transform_lane(column, column_fft.as_ref(), &mut buffer);
    }

    if direction == FourierDirection::Inverse {
        let scale = 1.0 / (rows * cols) as f64;
        output.mapv_inplace(|value| value * scale);
    }
    output
}

pub fn fft2(field: &Array2<Complex64>) -> Array2<Complex64> {
    transform2(field, FourierDirection::Forward)
}

pub fn ifft2(field: &Array2<Complex64>) -> Array2<Complex64> {
    transform2(field, FourierDirection::Inverse)
}

/// Moves the zero-frequency sample to the center of the array.
pub fn fftshift<T: Clone>(field: &Array2<T>) -> Array2<T> {
    let (rows, cols) = field.dim();
    roll(field, rows / 2, cols / 2)
}

/// Inverse of [`fftshift`], also for odd dimensions.
pub fn ifftshift<T: Clone>(field: &Array2<T>) -> Array2<T> {
    let (rows, cols) = field.dim();
    roll(field, rows - rows / 2, cols - cols / 2)
}

fn roll<T: Clone>(field: &Array2<T>, row_shift: usize, column_shift: usize) -> Array2<T> {
    let (rows, cols) = field.dim();
    Array2::from_shape_fn((rows, cols), |(row, col)| {
        field[[(row + rows - row_shift % rows) % rows, (col + cols - column_shift % cols) % cols]]
            .clone()
    })
}

fn transform_lane(
    mut lane: ArrayViewMut1<'_, Complex64>,
    fft: &dyn Fft<f64>,
    buffer: &mut [Complex64],
) {
    for (slot, value) in buffer.iter_mut().zip(lane.iter()) {
        *slot = *value;
    }
    fft.process(buffer);
    for (value, slot) in lane.iter_mut().zip(buffer.iter()) {
        *value = *slot;
    }
}

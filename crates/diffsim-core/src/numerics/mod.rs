pub mod form_factor;
pub mod fourier;
pub mod integration;
pub mod rotation;

pub use form_factor::{spheroid_argument, uniform_sphere_form_factor};
pub use fourier::{FourierDirection, fft2, fftshift, ifft2, ifftshift, transform2};
pub use integration::{integrate_midpoint, integrate_radial_density};
pub use rotation::{EulerAngles, Orientation};

use ndarray::Array2;
use num_complex::Complex64;

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut correction = 0.0;

    for value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

pub fn squared_norm3(vector: [f64; 3]) -> f64 {
    vector[0] * vector[0] + vector[1] * vector[1] + vector[2] * vector[2]
}

pub fn norm3(vector: [f64; 3]) -> f64 {
    squared_norm3(vector).sqrt()
}

pub fn dot3(lhs: [f64; 3], rhs: [f64; 3]) -> f64 {
    lhs[0] * rhs[0] + lhs[1] * rhs[1] + lhs[2] * rhs[2]
}

/// `count` evenly spaced values from `start` to `end`, both inclusive.
/// A single value sits at the midpoint.
pub fn linear_grid(start: f64, end: f64, count: usize) -> Option<Vec<f64>> {
    match count {
        0 => None,
        1 => Some(vec![0.5 * (start + end)]),
        _ => {
            let step = (end - start) / ((count - 1) as f64);
            let mut grid: Vec<f64> = (0..count).map(|index| start + step * index as f64).collect();
            if let Some(last) = grid.last_mut() {
                *last = end;
            }
            Some(grid)
        }
    }
}

pub fn interpolate_linear(x: f64, x_grid: &[f64], y_grid: &[f64]) -> Option<f64> {
    if x_grid.len() < 2 || x_grid.len() != y_grid.len() {
        return None;
    }

    if !x_grid.windows(2).all(|window| window[0] <= window[1]) {
        return None;
    }

    if x <= x_grid[0] {
        return Some(y_grid[0]);
    }

    let last_index = x_grid.len() - 1;
    if x >= x_grid[last_index] {
        return Some(y_grid[last_index]);
    }

    let upper = x_grid
        .windows(2)
        .position(|window| x <= window[1])
        .map(|index| index + 1)?;
    let lower = upper - 1;
    let x0 = x_grid[lower];
    let x1 = x_grid[upper];
    if x1 == x0 {
        return Some(y_grid[upper]);
    }

    let interpolation = (x - x0) / (x1 - x0);
    Some(y_grid[lower] + interpolation * (y_grid[upper] - y_grid[lower]))
}

/// Replaces every non-finite entry with zero and returns how many were
/// replaced.
pub fn sanitize_non_finite(field: &mut Array2<Complex64>) -> usize {
    let mut replaced = 0;
    field.mapv_inplace(|value| {
        if value.re.is_finite() && value.im.is_finite() {
            value
        } else {
            replaced += 1;
            Complex64::new(0.0, 0.0)
        }
    });
    replaced
}

#[cfg(test)]
mod tests {
    use super::{dot3, interpolate_linear, linear_grid, norm3, sanitize_non_finite, stable_sum};
    use ndarray::array;
    use num_complex::Complex64;

    #[test]
    fn stable_sum_reduces_order_loss_for_large_and_small_values() {
        assert_eq!(stable_sum([1.0e16, 1.0, -1.0e16]), 0.0);
        let tenths = stable_sum(std::iter::repeat_n(0.1, 10));
        assert!((tenths - 1.0).abs() <= f64::EPSILON);
    }

    #[test]
    fn vector_helpers_handle_three_dimensional_geometry() {
        assert!((norm3([2.0, 3.0, 6.0]) - 7.0).abs() < 1.0e-12);
        assert_eq!(dot3([1.0, 2.0, 3.0], [4.0, -5.0, 6.0]), 12.0);
    }

    #[test]
    fn linear_grid_is_inclusive_and_handles_small_counts() {
        assert_eq!(linear_grid(0.0, 1.0, 0), None);
        assert_eq!(linear_grid(1.0, 3.0, 1), Some(vec![2.0]));
        let grid = linear_grid(0.0, 2.0, 5).expect("grid");
        assert_eq!(grid, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn interpolate_linear_clamps_and_interpolates() {
        let x_grid = [0.0, 1.0, 2.0];
        let y_grid = [10.0, 20.0, 30.0];

        assert_eq!(interpolate_linear(-1.0, &x_grid, &y_grid), Some(10.0));
        assert_eq!(interpolate_linear(3.0, &x_grid, &y_grid), Some(30.0));
        assert_eq!(interpolate_linear(0.5, &x_grid, &y_grid), Some(15.0));
        assert_eq!(interpolate_linear(0.5, &[0.0], &[1.0]), None);
    }

    #[test]
    fn sanitize_zeroes_and_counts_non_finite_entries() {
        let mut field = array![
            [Complex64::new(1.0, 2.0), Complex64::new(f64::NAN, 0.0)],
            [Complex64::new(0.0, f64::INFINITY), Complex64::new(-3.0, 0.5)]
        ];
        assert_eq!(sanitize_non_finite(&mut field), 2);
        assert_eq!(field[[0, 1]], Complex64::new(0.0, 0.0));
        assert_eq!(field[[1, 0]], Complex64::new(0.0, 0.0));
        assert_eq!(field[[1, 1]], Complex64::new(-3.0, 0.5));
    }
}

use super::{dot3, squared_norm3};

const SERIES_CUTOFF: f64 = 1.0e-3;

/// Normalized form factor of a homogeneous sphere, `3(sin h − h cos h)/h³`
/// with `h = |q|·R`. Below `h = 1e-3` (including the direct beam, `h = 0`) the
/// limit `1 − h²/10` is returned instead of the indeterminate quotient.
pub fn uniform_sphere_form_factor(h: f64) -> f64 {
    let h = h.abs();
    if h < SERIES_CUTOFF {
        1.0 - h * h / 10.0
    } else {
        3.0 * (h.sin() - h * h.cos()) / (h * h * h)
    }
}

/// Effective sphere argument of a spheroid with equatorial semi-axis `a`,
/// polar semi-axis `c` and unit symmetry axis `axis`:
/// `√(a²(|q|² − (q·u)²) + c²(q·u)²)`.
pub fn spheroid_argument(q: [f64; 3], axis: [f64; 3], a: f64, c: f64) -> f64 {
    let along = dot3(q, axis);
    let across_squared = (squared_norm3(q) - along * along).max(0.0);
    (a * a * across_squared + c * c * along * along).sqrt()
}

use super::stable_sum;
use crate::common::constants::TWO_PI;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrationError {
    #[error("integration requires at least 1 interval")]
    NoIntervals,
    #[error("integration parameter '{field}' must be finite, got {value}")]
    NonFiniteParameter { field: &'static str, value: f64 },
    #[error("integration produced a non-finite result")]
    NonFiniteResult,
}

/// Composite midpoint rule on `[start, end]`. The integrand is never
/// evaluated at the end points, so integrable end-point singularities are
/// tolerated.
pub fn integrate_midpoint<F>(
    integrand: F,
    start: f64,
    end: f64,
    intervals: usize,
) -> Result<f64, IntegrationError>
where
    F: Fn(f64) -> f64,
{
    if intervals == 0 {
        return Err(IntegrationError::NoIntervals);
    }
    for (field, value) in [("start", start), ("end", end)] {
        if !value.is_finite() {
            return Err(IntegrationError::NonFiniteParameter { field, value });
        }
    }

    let step = (end - start) / intervals as f64;
    let sum =
        stable_sum((0..intervals).map(|index| integrand(start + (index as f64 + 0.5) * step)));
    let integral = sum * step;
    if integral.is_finite() {
        Ok(integral)
    } else {
        Err(IntegrationError::NonFiniteResult)
    }
}

/// Integrates a radially symmetric areal density over the whole plane,
/// `∫ 2πr p(r) dr` on `[0, ∞)`, through the substitution `r = s·t/(1 − t)`.
/// `scale` should be of the order of the density's width.
pub fn integrate_radial_density<F>(
    density: F,
    scale: f64,
    intervals: usize,
) -> Result<f64, IntegrationError>
where
    F: Fn(f64) -> f64,
{
    if !(scale.is_finite() && scale > 0.0) {
        return Err(IntegrationError::NonFiniteParameter {
            field: "scale",
            value: scale,
        });
    }

    integrate_midpoint(
        |t| {
            let remainder = 1.0 - t;
            let radius = scale * t / remainder;
            let jacobian = scale / (remainder * remainder);
            TWO_PI * radius * density(radius) * jacobian
        },
        0.0,
        1.0,
        intervals,
    )
}

#[cfg(test)]
mod tests {
    use super::{IntegrationError, integrate_midpoint, integrate_radial_density};
    use crate::common::constants::PI;

    #[test]
    fn midpoint_rule_integrates_polynomials() {
        let integral = integrate_midpoint(|x| x * x, 0.0, 3.0, 10_000).expect("integral");
        assert!((integral - 9.0).abs() < 1.0e-6);
    }

    #[test]
    fn midpoint_rule_rejects_invalid_input() {
        assert_eq!(
            integrate_midpoint(|x| x, 0.0, 1.0, 0),
            Err(IntegrationError::NoIntervals)
        );
        assert!(matches!(
            integrate_midpoint(|x| x, 0.0, f64::INFINITY, 10),
            Err(IntegrationError::NonFiniteParameter { field: "end", .. })
        ));
        assert_eq!(
            integrate_midpoint(|_| f64::NAN, 0.0, 1.0, 10),
            Err(IntegrationError::NonFiniteResult)
        );
    }

    #[test]
    fn radial_integration_covers_the_infinite_plane() {
        let sigma = 2.0;
        let gaussian = |r: f64| (-r * r / (2.0 * sigma * sigma)).exp() / (2.0 * PI * sigma * sigma);
        let integral = integrate_radial_density(gaussian, sigma, 100_000).expect("integral");
        assert!((integral - 1.0).abs() < 1.0e-6, "integral={integral}");
    }
}

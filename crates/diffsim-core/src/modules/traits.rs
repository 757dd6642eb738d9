use crate::domain::SimResult;
use crate::numerics::EulerAngles;
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;

/// Particle part of one shot: the scattering factor `∫ ρ_f(r) e^{-iq·r} d³r`
/// (in electrons) on the detector grid, plus the drawn particle parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleShot {
    pub scattering_factors: Array2<Complex64>,
    pub euler_angles: Option<EulerAngles>,
    pub diameter: Option<f64>,
}

pub trait ScatteringModel {
    fn number_of_images(&self) -> usize;

    /// Radius used for the sampling estimate; `None` when the particle has no
    /// single defined radius.
    fn radius(&self) -> Option<f64>;

    /// Draws the particle parameters of the next shot and evaluates its
    /// scattering factors at the scattering vectors `q` (1/m).
    fn scatter<R: Rng + ?Sized>(
        &mut self,
        q: &Array2<[f64; 3]>,
        rng: &mut R,
    ) -> SimResult<ParticleShot>;
}

#[cfg(test)]
mod tests {
    use super::{ParticleShot, ScatteringModel};
    use crate::domain::{SimError, SimErrorCategory, SimResult};
    use ndarray::Array2;
    use num_complex::Complex64;
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct PointScatterer {
        electrons: f64,
    }

    impl ScatteringModel for PointScatterer {
        fn number_of_images(&self) -> usize {
            1
        }

        fn radius(&self) -> Option<f64> {
            None
        }

        fn scatter<R: Rng + ?Sized>(
            &mut self,
            q: &Array2<[f64; 3]>,
            _rng: &mut R,
        ) -> SimResult<ParticleShot> {
            if self.electrons <= 0.0 {
                return Err(SimError::computation(
                    "RUN.EMPTY_PARTICLE",
                    "particle has no electrons",
                ));
            }
            Ok(ParticleShot {
                scattering_factors: q.map(|_| Complex64::new(self.electrons, 0.0)),
                euler_angles: None,
                diameter: None,
            })
        }
    }

    #[test]
    fn point_scatterer_is_flat_in_reciprocal_space() {
        let q = Array2::from_elem((2, 3), [1.0e9, 0.0, 0.0]);
        let shot = PointScatterer { electrons: 10.0 }
            .scatter(&q, &mut StdRng::seed_from_u64(0))
            .expect("shot");
        assert_eq!(shot.scattering_factors.dim(), (2, 3));
        assert!(shot.scattering_factors.iter().all(|value| value.re == 10.0));
    }

    #[test]
    fn scattering_models_use_shared_error_types() {
        let q = Array2::from_elem((1, 1), [0.0; 3]);
        let error = PointScatterer { electrons: 0.0 }
            .scatter(&q, &mut StdRng::seed_from_u64(0))
            .expect_err("empty particle");
        assert_eq!(error.category(), SimErrorCategory::Computation);
        assert_eq!(error.exit_code(), 4);
    }
}

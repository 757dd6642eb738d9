use super::input::Input;
use super::sample::ShotRecord;
use crate::common::constants::PI;
use crate::domain::{PixelSizeMode, SimError, SimResult};
use crate::numerics::{fftshift, ifft2, ifftshift, sanitize_non_finite, stable_sum};
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;

/// Largest pixel pitch that still samples the speckles of a particle with
/// the given cross-sectional area at Nyquist rate: `D·λ/d` with
/// `d = 2·sqrt(area/π)`.
pub fn nyquist_pixel_size(distance: f64, wavelength: f64, cross_section_area: f64) -> f64 {
    let diameter = 2.0 * (cross_section_area / PI).sqrt();
    distance * wavelength / diameter
}

/// Full-period resolution `λ / sin(atan(Y/D))` reached at scattering angle
/// `atan(Y/D)`.
pub fn full_period_resolution(wavelength: f64, edge_distance: f64, distance: f64) -> f64 {
    wavelength / (edge_distance / distance).atan().sin()
}

/// Results of one propagation run. Holds the input it was produced from
/// immutably; all accessors derive their values from the stored amplitudes.
#[derive(Debug, Clone)]
pub struct Output<'a> {
    input: &'a Input,
    amplitudes: Vec<Array2<Complex64>>,
    shots: Vec<ShotRecord>,
}

impl<'a> Output<'a> {
    /// Propagates every configured image of `input`.
    pub fn new(input: &'a mut Input) -> SimResult<Self> {
        tracing::debug!("propagation started");
        let result = input.propagate()?;
        tracing::debug!(images = result.amplitudes.len(), "propagation finished");
        Ok(Self {
            input,
            amplitudes: result.amplitudes,
            shots: result.shots,
        })
    }

    pub fn input(&self) -> &Input {
        self.input
    }

    pub fn number_of_images(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn amplitudes(&self) -> &[Array2<Complex64>] {
        &self.amplitudes
    }

    pub fn amplitude(&self, index: usize) -> SimResult<&Array2<Complex64>> {
        self.amplitudes.get(index).ok_or_else(|| {
            SimError::computation(
                "RUN.IMAGE_INDEX",
                format!(
                    "image {} requested but only {} were propagated",
                    index,
                    self.amplitudes.len()
                ),
            )
        })
    }

    pub fn shots(&self) -> &[ShotRecord] {
        &self.shots
    }

    /// Expected photons per binned pixel of image `index`.
    pub fn intensity_pattern(&self, index: usize) -> SimResult<Array2<f64>> {
        let amplitude = self.amplitude(index)?;
        self.input
            .detector()
            .detect_photons(&amplitude.mapv(|value| value.norm_sqr()))
    }

    /// Photon counts of image `index` with the detector's noise model and
    /// saturation applied.
    pub fn noisy_intensity_pattern<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> SimResult<Array2<f64>> {
        let amplitude = self.amplitude(index)?;
        self.input
            .detector()
            .detect_photons_with_noise(&amplitude.mapv(|value| value.norm_sqr()), rng)
    }

    pub fn total_photons(&self, index: usize) -> SimResult<f64> {
        let pattern = self.intensity_pattern(index)?;
        Ok(stable_sum(pattern.iter().copied()))
    }

    /// Back-propagated real-space image of image `index`, centered.
    /// Non-finite amplitudes are zeroed on a copy first.
    pub fn real_space_image(&self, index: usize) -> SimResult<Array2<Complex64>> {
        let mut amplitude = self.amplitude(index)?.clone();
        let zeroed = sanitize_non_finite(&mut amplitude);
        if zeroed > 0 {
            tracing::warn!(index, zeroed, "zeroed non-finite amplitudes before back-propagation");
        }
        Ok(fftshift(&ifft2(&ifftshift(&amplitude))))
    }

    /// Nyquist pixel size over the binned pixel size, `None` when the sample
    /// has no defined radius.
    pub fn linear_sampling_ratio(&self) -> Option<f64> {
        let radius = self.input.sample().radius()?;
        let detector = self.input.detector();
        let nyquist = nyquist_pixel_size(
            detector.distance(),
            self.input.source().wavelength(),
            PI * radius * radius,
        );
        Some(nyquist / detector.pixel_size(PixelSizeMode::Binned))
    }

    pub fn full_period_edge_resolution(&self) -> f64 {
        let detector = self.input.detector();
        full_period_resolution(
            self.input.source().wavelength(),
            detector.minimum_center_edge_distance(),
            detector.distance(),
        )
    }
}

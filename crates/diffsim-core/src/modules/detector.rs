use crate::common::constants::TWO_PI;
use crate::domain::{
    CheckedSection, ConfigResult, DETECTOR_SECTION, FromSection, KeywordSpec, PixelSizeMode,
    SimError, SimResult,
};
use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DETECTOR_KEYWORDS: KeywordSpec = KeywordSpec {
    section: DETECTOR_SECTION,
    required: &[&["distance"], &["pixel_size"], &["nx"], &["ny"]],
    optional: &["binning", "cx", "cy", "noise", "saturation_level"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NoiseModel {
    #[default]
    None,
    Poisson,
}

impl NoiseModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Poisson => "poisson",
        }
    }
}

impl FromStr for NoiseModel {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "none" => Ok(Self::None),
            "poisson" => Ok(Self::Poisson),
            other => Err(SimError::configuration(
                "CONFIG.INVALID_CHOICE",
                format!("'{}' is not a noise model (expected none or poisson)", other),
            )),
        }
    }
}

impl Display for NoiseModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Per-pixel scattering geometry on the unbinned detector grid, indexed
/// `[iy, ix]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringGeometry {
    /// Scattering vector `k(r̂ − x̂)` in 1/m.
    pub q: Array2<[f64; 3]>,
    /// Solid angle per unit detector area, `D/|r|³` in 1/m².
    pub solid_angle_per_area: Array2<f64>,
}

/// Flat area detector perpendicular to the beam at `distance` downstream of
/// the sample. The beam hits the detector at pixel coordinates `(cx, cy)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    distance: f64,
    pixel_size: f64,
    nx: usize,
    ny: usize,
    binning: usize,
    cx: f64,
    cy: f64,
    noise: NoiseModel,
    saturation_level: Option<f64>,
}

impl Detector {
    pub fn new(distance: f64, pixel_size: f64, nx: usize, ny: usize) -> ConfigResult<Self> {
        for (keyword, value) in [("distance", distance), ("pixel_size", pixel_size)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::configuration(
                    "CONFIG.INVALID_VALUE",
                    format!("detector {} must be finite and > 0, got {}", keyword, value),
                ));
            }
        }
        if nx == 0 || ny == 0 {
            return Err(SimError::configuration(
                "CONFIG.INVALID_VALUE",
                format!("detector needs at least one pixel per axis, got {}x{}", nx, ny),
            ));
        }
        Ok(Self {
            distance,
            pixel_size,
            nx,
            ny,
            binning: 1,
            cx: centered(nx),
            cy: centered(ny),
            noise: NoiseModel::None,
            saturation_level: None,
        })
    }

    pub fn with_binning(mut self, binning: usize) -> ConfigResult<Self> {
        if binning == 0 || binning > self.nx.min(self.ny) {
            return Err(SimError::configuration(
                "CONFIG.INVALID_VALUE",
                format!(
                    "binning must be between 1 and {}, got {}",
                    self.nx.min(self.ny),
                    binning
                ),
            ));
        }
        self.binning = binning;
        Ok(self)
    }

    pub fn with_center(mut self, cx: f64, cy: f64) -> ConfigResult<Self> {
        for (keyword, value, pixels) in [("cx", cx, self.nx), ("cy", cy, self.ny)] {
            let last = (pixels - 1) as f64;
            if !(value.is_finite() && (0.0..=last).contains(&value)) {
                return Err(SimError::configuration(
                    "CONFIG.INVALID_VALUE",
                    format!(
                        "beam center {} must lie on the detector [0, {}], got {}",
                        keyword, last, value
                    ),
                ));
            }
        }
        self.cx = cx;
        self.cy = cy;
        Ok(self)
    }

    pub fn with_noise(
        mut self,
        noise: NoiseModel,
        saturation_level: Option<f64>,
    ) -> ConfigResult<Self> {
        match saturation_level {
            Some(level) if !(level.is_finite() && level > 0.0) => {
                return Err(SimError::configuration(
                    "CONFIG.INVALID_VALUE",
                    format!("saturation_level must be finite and > 0, got {}", level),
                ));
            }
            _ => {}
        }
        self.noise = noise;
        self.saturation_level = saturation_level;
        Ok(self)
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// Shape after binning; trailing pixels that do not fill a bin are
    /// dropped.
    pub fn binned_shape(&self) -> (usize, usize) {
        (self.ny / self.binning, self.nx / self.binning)
    }

    pub fn binning(&self) -> usize {
        self.binning
    }

    pub fn center(&self) -> (f64, f64) {
        (self.cx, self.cy)
    }

    pub fn noise(&self) -> NoiseModel {
        self.noise
    }

    pub fn saturation_level(&self) -> Option<f64> {
        self.saturation_level
    }

    pub fn pixel_size(&self, mode: PixelSizeMode) -> f64 {
        match mode {
            PixelSizeMode::Raw => self.pixel_size,
            PixelSizeMode::Binned => self.pixel_size * self.binning as f64,
        }
    }

    /// Shortest distance from the beam center to the outermost pixel
    /// centers, in meters.
    pub fn minimum_center_edge_distance(&self) -> f64 {
        let last_x = (self.nx - 1) as f64;
        let last_y = (self.ny - 1) as f64;
        let pixels = self
            .cx
            .min(last_x - self.cx)
            .min(self.cy)
            .min(last_y - self.cy);
        pixels * self.pixel_size
    }

    /// Lab-frame position of the center of pixel `(iy, ix)`.
    pub fn pixel_position(&self, iy: usize, ix: usize) -> [f64; 3] {
        [
            self.distance,
            (ix as f64 - self.cx) * self.pixel_size,
            (iy as f64 - self.cy) * self.pixel_size,
        ]
    }

    pub fn scattering_geometry(&self, wavelength: f64) -> SimResult<ScatteringGeometry> {
        if !(wavelength.is_finite() && wavelength > 0.0) {
            return Err(SimError::computation(
                "RUN.WAVELENGTH",
                format!("wavelength must be finite and > 0, got {}", wavelength),
            ));
        }
        let wavenumber = TWO_PI / wavelength;
        let shape = self.shape();
        let mut q = Array2::from_elem(shape, [0.0; 3]);
        let mut solid_angle_per_area = Array2::zeros(shape);
        for ((iy, ix), slot) in q.indexed_iter_mut() {
            let position = self.pixel_position(iy, ix);
            let norm = crate::numerics::norm3(position);
            *slot = [
                wavenumber * (position[0] / norm - 1.0),
                wavenumber * position[1] / norm,
                wavenumber * position[2] / norm,
            ];
            solid_angle_per_area[[iy, ix]] = self.distance / (norm * norm * norm);
        }
        Ok(ScatteringGeometry {
            q,
            solid_angle_per_area,
        })
    }

    /// Converts an intensity in photons/m² on the unbinned grid into expected
    /// photons per (binned) pixel.
    pub fn detect_photons(&self, intensity: &Array2<f64>) -> SimResult<Array2<f64>> {
        if intensity.dim() != self.shape() {
            return Err(SimError::computation(
                "RUN.SHAPE_MISMATCH",
                format!(
                    "intensity has shape {:?}, detector has {:?}",
                    intensity.dim(),
                    self.shape()
                ),
            ));
        }
        let area = self.pixel_size * self.pixel_size;
        let bin = self.binning;
        let mut photons = Array2::zeros(self.binned_shape());
        for ((by, bx), slot) in photons.indexed_iter_mut() {
            let block =
                intensity.slice(ndarray::s![by * bin..(by + 1) * bin, bx * bin..(bx + 1) * bin]);
            *slot = crate::numerics::stable_sum(block.iter().copied()) * area;
        }
        Ok(photons)
    }

    /// Like [`Detector::detect_photons`], then applies the configured noise
    /// model and saturation.
    pub fn detect_photons_with_noise<R: Rng + ?Sized>(
        &self,
        intensity: &Array2<f64>,
        rng: &mut R,
    ) -> SimResult<Array2<f64>> {
        let mut counts = self.detect_photons(intensity)?;
        if self.noise == NoiseModel::Poisson {
            for value in counts.iter_mut() {
                if *value > 0.0 {
                    let distribution = Poisson::new(*value).map_err(|error| {
                        SimError::computation(
                            "RUN.DETECTOR_NOISE",
                            format!("cannot draw counts around {}: {}", value, error),
                        )
                    })?;
                    *value = distribution.sample(rng);
                }
            }
        }
        if let Some(level) = self.saturation_level {
            counts.mapv_inplace(|value| value.min(level));
        }
        Ok(counts)
    }
}

fn centered(pixels: usize) -> f64 {
    (pixels as f64 - 1.0) / 2.0
}

impl FromSection for Detector {
    const KEYWORDS: KeywordSpec = DETECTOR_KEYWORDS;

    fn from_checked(section: CheckedSection<'_>) -> ConfigResult<Self> {
        let nx = section.count("nx")?;
        let ny = section.count("ny")?;
        let detector = Self::new(
            section.positive_number("distance")?,
            section.positive_number("pixel_size")?,
            nx,
            ny,
        )?;
        let binning = section.optional_count("binning")?.unwrap_or(1);
        let cx = section.optional_number("cx")?.unwrap_or_else(|| centered(nx));
        let cy = section.optional_number("cy")?.unwrap_or_else(|| centered(ny));
        let noise = match section.optional_text("noise")? {
            Some(name) => name
                .parse::<NoiseModel>()
                .map_err(|_| section.invalid_choice("noise", name, &["none", "poisson"]))?,
            None => NoiseModel::None,
        };
        detector
            .with_binning(binning)?
            .with_center(cx, cy)?
            .with_noise(noise, section.optional_number("saturation_level")?)
    }
}

#[cfg(test)]
mod tests {
    use super::{Detector, NoiseModel};
    use crate::domain::{ConfigSection, PixelSizeMode, parse_section};
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn detector(binning: u64) -> Detector {
        let section = ConfigSection::new()
            .with("distance", 0.74)
            .with("pixel_size", 75.0e-6)
            .with("nx", 6_u64)
            .with("ny", 4_u64)
            .with("binning", binning);
        parse_section::<Detector>(&section).expect("valid detector")
    }

    #[test]
    fn pixel_size_respects_binning() {
        let detector = detector(2);
        assert_eq!(detector.pixel_size(PixelSizeMode::Raw), 75.0e-6);
        assert!((detector.pixel_size(PixelSizeMode::Binned) - 150.0e-6).abs() < 1.0e-18);
        assert_eq!(detector.binned_shape(), (2, 3));
    }

    #[test]
    fn minimum_center_edge_distance_uses_the_closest_edge() {
        let centered = detector(1);
        assert!((centered.minimum_center_edge_distance() - 1.5 * 75.0e-6).abs() < 1.0e-15);

        let shifted = detector(1).with_center(1.0, 2.0).expect("center on detector");
        assert!((shifted.minimum_center_edge_distance() - 75.0e-6).abs() < 1.0e-15);
        assert!(detector(1).with_center(6.0, 1.0).is_err());
    }

    #[test]
    fn detect_photons_is_linear() {
        let detector = detector(2);
        let intensity = Array2::from_shape_fn((4, 6), |(iy, ix)| 1.0e9 * (1 + iy * 6 + ix) as f64);
        let single = detector.detect_photons(&intensity).expect("photons");
        let doubled = detector
            .detect_photons(&intensity.mapv(|value| 2.0 * value))
            .expect("photons");
        for (lhs, rhs) in single.iter().zip(doubled.iter()) {
            assert!((2.0 * lhs - rhs).abs() <= 1.0e-12 * rhs.abs());
        }
    }

    #[test]
    fn detect_photons_sums_bins_and_scales_by_pixel_area() {
        let detector = detector(2);
        let intensity = Array2::from_elem((4, 6), 1.0e10);
        let photons = detector.detect_photons(&intensity).expect("photons");
        let per_bin = 4.0 * 1.0e10 * 75.0e-6 * 75.0e-6;
        assert!(photons.iter().all(|value| (value - per_bin).abs() < 1.0e-9 * per_bin));

        let wrong = Array2::zeros((3, 3));
        let error = detector.detect_photons(&wrong).expect_err("shape mismatch");
        assert_eq!(error.placeholder(), "RUN.SHAPE_MISMATCH");
    }

    #[test]
    fn scattering_vector_vanishes_on_the_beam_axis() {
        let detector = Detector::new(1.0, 1.0e-3, 3, 3).expect("valid detector");
        let geometry = detector.scattering_geometry(1.0e-10).expect("geometry");
        assert_eq!(geometry.q[[1, 1]], [0.0, 0.0, 0.0]);
        assert!((geometry.solid_angle_per_area[[1, 1]] - 1.0).abs() < 1.0e-12);
        let corner = geometry.q[[0, 2]];
        assert!(corner[1] > 0.0 && corner[2] < 0.0 && corner[0] < 0.0);
    }

    #[test]
    fn poisson_noise_is_reproducible_and_saturates() {
        let detector = detector(1)
            .with_noise(NoiseModel::Poisson, Some(50.0))
            .expect("valid noise");
        let intensity = Array2::from_elem((4, 6), 20.0 / (75.0e-6 * 75.0e-6));
        let first = detector
            .detect_photons_with_noise(&intensity, &mut StdRng::seed_from_u64(4))
            .expect("counts");
        let second = detector
            .detect_photons_with_noise(&intensity, &mut StdRng::seed_from_u64(4))
            .expect("counts");
        assert_eq!(first, second);
        assert!(first.iter().all(|count| count.fract() == 0.0 && *count <= 50.0));

        let saturated = detector
            .detect_photons_with_noise(
                &intensity.mapv(|value| value * 100.0),
                &mut StdRng::seed_from_u64(4),
            )
            .expect("counts");
        assert!(saturated.iter().all(|count| *count == 50.0));
    }

    #[test]
    fn invalid_detector_settings_are_rejected() {
        let section = ConfigSection::new()
            .with("distance", 0.0)
            .with("pixel_size", 75.0e-6)
            .with("nx", 4_u64)
            .with("ny", 4_u64);
        let error = parse_section::<Detector>(&section).expect_err("zero distance");
        assert_eq!(error.placeholder(), "CONFIG.INVALID_VALUE");

        let noise = section.clone().with("distance", 1.0).with("noise", "gaussian");
        let error = parse_section::<Detector>(&noise).expect_err("unknown noise model");
        assert_eq!(error.placeholder(), "CONFIG.INVALID_CHOICE");

        let missing = ConfigSection::new().with("distance", 1.0);
        let error = parse_section::<Detector>(&missing).expect_err("missing keywords");
        assert!(error.message().contains("pixel_size"));
    }
}

//! Particles and their far-field amplitudes.
//!
//! Every variant reduces a shot to a scattering factor `F(q)` in electrons on
//! the detector grid. [`Sample::propagate`] turns it into the detected
//! amplitude `A = r_e · F(q) · sqrt(I0 · D/|r|³)`, so that `|A|²` is a photon
//! density on the detector plane.

mod alignment;
mod map;
mod sphere;
mod spheroid;

pub use alignment::Alignment;
pub use map::{MAX_MAP_CELLS, MapGeometry, MapSample, MapSettings};
pub use sphere::{SphereSample, SphereSettings};
pub use spheroid::{SpheroidSample, SpheroidSettings};

use super::detector::Detector;
use super::source::{ShotPulse, Source};
use super::traits::{ParticleShot, ScatteringModel};
use crate::common::constants::CLASSICAL_ELECTRON_RADIUS;
use crate::common::{ElementTables, Material, MaterialType};
use crate::domain::{
    CheckedSection, ConfigResult, ConfigSection, EnergyUnit, IntensityUnit, KeywordError,
    SimError, SimResult, parse_section,
};
use crate::numerics::{EulerAngles, sanitize_non_finite};
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub(crate) const MATERIAL_KEYWORDS: [&str; 2] = ["material_type", "atomic_composition"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    UniformSphere,
    UniformSpheroid,
    Map3d,
}

impl SampleType {
    pub const ALL: [SampleType; 3] = [Self::UniformSphere, Self::UniformSpheroid, Self::Map3d];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UniformSphere => "uniform_sphere",
            Self::UniformSpheroid => "uniform_spheroid",
            Self::Map3d => "map3d",
        }
    }
}

impl FromStr for SampleType {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sample_type| sample_type.as_str() == name)
            .ok_or_else(|| {
                SimError::configuration(
                    "CONFIG.INVALID_CHOICE",
                    format!(
                        "'{}' is not a sample type (expected one of: {})",
                        name,
                        Self::ALL.map(Self::as_str).join(", ")
                    ),
                )
            })
    }
}

impl Display for SampleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Metadata of one propagated shot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotRecord {
    pub pulse: ShotPulse,
    pub euler_angles: Option<EulerAngles>,
    pub sample_diameter: Option<f64>,
    pub sanitized_pixels: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropagationResult {
    pub amplitudes: Vec<Array2<Complex64>>,
    pub shots: Vec<ShotRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Sphere(SphereSample),
    Spheroid(SpheroidSample),
    Map(MapSample),
}

impl Sample {
    /// Builds the variant named by the section's `sample_type`. Scattering
    /// densities are resolved at the photon energy of `source`.
    pub fn from_section(
        section: &ConfigSection,
        source: &Source,
        tables: &ElementTables,
    ) -> ConfigResult<Self> {
        let name = section
            .get("sample_type")
            .ok_or_else(|| KeywordError::Missing {
                section: crate::domain::SAMPLE_SECTION,
                keywords: vec!["sample_type".to_string()],
            })?
            .as_str()
            .ok_or_else(|| {
                SimError::configuration(
                    "CONFIG.INVALID_TYPE",
                    "section 'sample' keyword 'sample_type' must be a text",
                )
            })?;
        let photon_energy_ev = source.photon().energy(EnergyUnit::ElectronVolt);

        let sample = match name.parse::<SampleType>()? {
            SampleType::UniformSphere => {
                let settings = parse_section::<SphereSettings>(section)?;
                Self::Sphere(SphereSample::new(settings, photon_energy_ev, tables)?)
            }
            SampleType::UniformSpheroid => {
                let settings = parse_section::<SpheroidSettings>(section)?;
                Self::Spheroid(SpheroidSample::new(settings, photon_energy_ev, tables)?)
            }
            SampleType::Map3d => {
                let settings = parse_section::<MapSettings>(section)?;
                Self::Map(MapSample::new(settings, photon_energy_ev, tables)?)
            }
        };
        tracing::debug!(sample_type = %sample.sample_type(), "sample configured");
        Ok(sample)
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::Sphere(_) => SampleType::UniformSphere,
            Self::Spheroid(_) => SampleType::UniformSpheroid,
            Self::Map(_) => SampleType::Map3d,
        }
    }

    pub fn number_of_images(&self) -> usize {
        match self {
            Self::Sphere(sample) => sample.number_of_images(),
            Self::Spheroid(sample) => sample.number_of_images(),
            Self::Map(sample) => sample.number_of_images(),
        }
    }

    pub fn radius(&self) -> Option<f64> {
        match self {
            Self::Sphere(sample) => sample.radius(),
            Self::Spheroid(sample) => sample.radius(),
            Self::Map(sample) => sample.radius(),
        }
    }

    /// Runs `number_of_images` shots against the current source and detector
    /// state.
    pub fn propagate<R: Rng + ?Sized>(
        &mut self,
        source: &mut Source,
        detector: &Detector,
        rng: &mut R,
    ) -> SimResult<PropagationResult> {
        let geometry = detector.scattering_geometry(source.wavelength())?;
        let images = self.number_of_images();
        let mut amplitudes = Vec::with_capacity(images);
        let mut shots = Vec::with_capacity(images);

        for image in 0..images {
            let pulse = source.next_shot(rng)?;
            let fluence = source.intensity_at([0.0; 3], IntensityUnit::PhotonsPerSquareMeter)?;
            let particle = match self {
                Self::Sphere(sample) => sample.scatter(&geometry.q, rng)?,
                Self::Spheroid(sample) => sample.scatter(&geometry.q, rng)?,
                Self::Map(sample) => sample.scatter(&geometry.q, rng)?,
            };
            let ParticleShot {
                scattering_factors,
                euler_angles,
                diameter,
            } = particle;

            let mut amplitude = Array2::from_shape_fn(scattering_factors.dim(), |index| {
                let incident = (fluence * geometry.solid_angle_per_area[index]).sqrt();
                scattering_factors[index] * (CLASSICAL_ELECTRON_RADIUS * incident)
            });
            let sanitized_pixels = sanitize_non_finite(&mut amplitude);
            if sanitized_pixels > 0 {
                tracing::warn!(image, sanitized_pixels, "zeroed non-finite amplitudes");
            }
            tracing::debug!(image, pulse_energy = pulse.pulse_energy, "shot propagated");

            amplitudes.push(amplitude);
            shots.push(ShotRecord {
                pulse,
                euler_angles,
                sample_diameter: diameter,
                sanitized_pixels,
            });
        }

        Ok(PropagationResult { amplitudes, shots })
    }
}

/// Reads either a `material_type` preset or an `atomic_composition` table with
/// its `massdensity`.
pub(crate) fn material_from_section(section: &CheckedSection<'_>) -> ConfigResult<Material> {
    let (keyword, value) = section.alternative(&MATERIAL_KEYWORDS)?;
    if keyword == "material_type" {
        if section.contains("massdensity") {
            return Err(KeywordError::Conflicting {
                section: section.name(),
                keywords: vec!["material_type".to_string(), "massdensity".to_string()],
            }
            .into());
        }
        let name = section.expect_text(keyword, value)?;
        let material_type = name.parse::<MaterialType>().map_err(|_| {
            section.invalid_choice(keyword, name, &MaterialType::ALL.map(MaterialType::as_str))
        })?;
        return Ok(Material::from_type(material_type));
    }

    if !section.contains("massdensity") {
        return Err(KeywordError::Missing {
            section: section.name(),
            keywords: vec!["massdensity".to_string()],
        }
        .into());
    }
    let composition = section
        .optional_table("atomic_composition")?
        .into_iter()
        .flatten()
        .map(|(symbol, count)| {
            section
                .expect_number("atomic_composition", count)
                .map(|count| (symbol.clone(), count))
        })
        .collect::<ConfigResult<Vec<_>>>()?;
    Material::custom(composition, section.positive_number("massdensity")?)
}

/// Complex scattering density of `material` in electrons per m³.
pub(crate) fn resolve_scattering_density(
    material: &Material,
    photon_energy_ev: f64,
    tables: &ElementTables,
) -> SimResult<Complex64> {
    let density = material.scattering_density(tables, photon_energy_ev)?;
    if !(density.re.is_finite() && density.im.is_finite()) {
        return Err(SimError::computation(
            "RUN.SCATTERING_DENSITY",
            format!("material scattering density is not finite: {}", density),
        ));
    }
    Ok(density)
}

use super::alignment::{ALIGNMENT_KEYWORDS, Alignment};
use super::{MATERIAL_KEYWORDS, material_from_section, resolve_scattering_density};
use crate::common::constants::PI;
use crate::common::{ElementTables, Material};
use crate::domain::{
    CheckedSection, ConfigResult, FromSection, KeywordSpec, SAMPLE_SECTION, SimResult,
};
use crate::modules::traits::{ParticleShot, ScatteringModel};
use crate::modules::variation::{Variation, VariedQuantity};
use crate::numerics::{spheroid_argument, uniform_sphere_form_factor};
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;

const SYMMETRY_AXIS: [f64; 3] = [0.0, 0.0, 1.0];

#[derive(Debug, Clone, PartialEq)]
pub struct SpheroidSettings {
    /// Volume-equivalent sphere diameter.
    pub diameter: f64,
    /// Polar over equatorial semi-axis, `c/a`.
    pub flattening: f64,
    pub diameter_variation: Variation,
    pub material: Material,
    pub alignment: Alignment,
    pub number_of_images: usize,
}

impl FromSection for SpheroidSettings {
    const KEYWORDS: KeywordSpec = KeywordSpec {
        section: SAMPLE_SECTION,
        required: &[
            &["sample_type"],
            &["diameter"],
            &["flattening"],
            &MATERIAL_KEYWORDS,
        ],
        optional: &[
            "massdensity",
            "number_of_images",
            "diameter_variation",
            "diameter_spread",
            "diameter_variation_n",
            ALIGNMENT_KEYWORDS[0],
            ALIGNMENT_KEYWORDS[1],
            ALIGNMENT_KEYWORDS[2],
            ALIGNMENT_KEYWORDS[3],
        ],
    };

    fn from_checked(section: CheckedSection<'_>) -> ConfigResult<Self> {
        Ok(Self {
            diameter: section.positive_number("diameter")?,
            flattening: section.positive_number("flattening")?,
            diameter_variation: Variation::from_section(&section, VariedQuantity::SampleDiameter)?,
            material: material_from_section(&section)?,
            alignment: Alignment::from_section(&section)?,
            number_of_images: section.optional_count("number_of_images")?.unwrap_or(1),
        })
    }
}

/// Equatorial and polar semi-axes `(a, c)` of a spheroid with the volume of
/// a sphere of `diameter`.
pub fn spheroid_semi_axes(diameter: f64, flattening: f64) -> (f64, f64) {
    let radius = diameter / 2.0;
    (radius * flattening.powf(-1.0 / 3.0), radius * flattening.powf(2.0 / 3.0))
}

/// Homogeneous spheroid, symmetric about its body z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpheroidSample {
    settings: SpheroidSettings,
    scattering_density: Complex64,
}

impl SpheroidSample {
    pub fn new(
        settings: SpheroidSettings,
        photon_energy_ev: f64,
        tables: &ElementTables,
    ) -> SimResult<Self> {
        let scattering_density =
            resolve_scattering_density(&settings.material, photon_energy_ev, tables)?;
        Ok(Self {
            settings,
            scattering_density,
        })
    }

    pub fn settings(&self) -> &SpheroidSettings {
        &self.settings
    }
}

impl ScatteringModel for SpheroidSample {
    fn number_of_images(&self) -> usize {
        self.settings.number_of_images
    }

    fn radius(&self) -> Option<f64> {
        Some(self.settings.diameter / 2.0)
    }

    fn scatter<R: Rng + ?Sized>(
        &mut self,
        q: &Array2<[f64; 3]>,
        rng: &mut R,
    ) -> SimResult<ParticleShot> {
        let diameter = self
            .settings
            .diameter_variation
            .next(self.settings.diameter, rng)?;
        let orientation = self.settings.alignment.next(rng);
        let axis = orientation.rotate(SYMMETRY_AXIS);
        let (a, c) = spheroid_semi_axes(diameter, self.settings.flattening);
        let electrons = self.scattering_density * (4.0 / 3.0 * PI * a * a * c);
        let scattering_factors = q.map(|vector| {
            electrons * uniform_sphere_form_factor(spheroid_argument(*vector, axis, a, c))
        });
        Ok(ParticleShot {
            scattering_factors,
            euler_angles: Some(orientation.euler_angles()),
            diameter: Some(diameter),
        })
    }
}

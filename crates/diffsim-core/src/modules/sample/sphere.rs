use super::{MATERIAL_KEYWORDS, material_from_section, resolve_scattering_density};
use crate::common::constants::PI;
use crate::common::{ElementTables, Material};
use crate::domain::{
    CheckedSection, ConfigResult, FromSection, KeywordSpec, SAMPLE_SECTION, SimResult,
};
use crate::modules::traits::{ParticleShot, ScatteringModel};
use crate::modules::variation::{Variation, VariedQuantity};
use crate::numerics::{norm3, uniform_sphere_form_factor};
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct SphereSettings {
    pub diameter: f64,
    pub diameter_variation: Variation,
    pub material: Material,
    pub number_of_images: usize,
}

impl FromSection for SphereSettings {
    const KEYWORDS: KeywordSpec = KeywordSpec {
        section: SAMPLE_SECTION,
        required: &[&["sample_type"], &["diameter"], &MATERIAL_KEYWORDS],
        optional: &[
            "massdensity",
            "number_of_images",
            "diameter_variation",
            "diameter_spread",
            "diameter_variation_n",
        ],
    };

    fn from_checked(section: CheckedSection<'_>) -> ConfigResult<Self> {
        Ok(Self {
            diameter: section.positive_number("diameter")?,
            diameter_variation: Variation::from_section(&section, VariedQuantity::SampleDiameter)?,
            material: material_from_section(&section)?,
            number_of_images: section.optional_count("number_of_images")?.unwrap_or(1),
        })
    }
}

/// Homogeneous sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereSample {
    settings: SphereSettings,
    scattering_density: Complex64,
}

impl SphereSample {
    pub fn new(
        settings: SphereSettings,
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

    pub fn settings(&self) -> &SphereSettings {
        &self.settings
    }

    pub fn scattering_density(&self) -> Complex64 {
        self.scattering_density
    }
}

impl ScatteringModel for SphereSample {
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
        let radius = diameter / 2.0;
        let electrons = self.scattering_density * (4.0 / 3.0 * PI * radius.powi(3));
        let scattering_factors =
            q.map(|vector| electrons * uniform_sphere_form_factor(norm3(*vector) * radius));
        Ok(ParticleShot {
            scattering_factors,
            euler_angles: None,
            diameter: Some(diameter),
        })
    }
}

use super::photon::Photon;
use super::profile::{ProfileModel, PulseProfile};
use super::variation::{Variation, VariedQuantity};
use crate::domain::{
    CheckedSection, ConfigResult, EnergyUnit, FromSection, IntensityUnit, KeywordSpec, SimError,
    SimResult, SOURCE_SECTION,
};
use rand::Rng;
use serde::Serialize;

const SOURCE_KEYWORDS: KeywordSpec = KeywordSpec {
    section: SOURCE_SECTION,
    required: &[
        &["wavelength", "photon_energy", "photon_energy_eV"],
        &["focus_diameter"],
        &["pulse_energy_mean", "pulse_energy"],
    ],
    optional: &[
        "pulse_energy_variation",
        "pulse_energy_spread",
        "pulse_energy_variation_n",
        "profile_model",
    ],
};

/// Realized pulse of one shot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShotPulse {
    pub pulse_energy: f64,
    pub wavelength: f64,
}

/// Pulsed X-ray source: photon energy, focal spot and shot-to-shot pulse
/// energy.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    photon: Photon,
    profile: PulseProfile,
    pulse_energy_mean: f64,
    pulse_energy_variation: Variation,
    pulse_energy: Option<f64>,
}

impl Source {
    pub fn new(
        photon: Photon,
        profile: PulseProfile,
        pulse_energy_mean: f64,
        pulse_energy_variation: Variation,
    ) -> ConfigResult<Self> {
        if !(pulse_energy_mean.is_finite() && pulse_energy_mean > 0.0) {
            return Err(SimError::configuration(
                "CONFIG.INVALID_VALUE",
                format!("mean pulse energy must be finite and > 0, got {}", pulse_energy_mean),
            ));
        }
        Ok(Self {
            photon,
            profile,
            pulse_energy_mean,
            pulse_energy_variation,
            pulse_energy: None,
        })
    }

    pub fn photon(&self) -> &Photon {
        &self.photon
    }

    pub fn wavelength(&self) -> f64 {
        self.photon.wavelength()
    }

    pub fn profile(&self) -> &PulseProfile {
        &self.profile
    }

    pub fn focus_diameter(&self) -> f64 {
        self.profile.focus_diameter()
    }

    pub fn pulse_energy_mean(&self) -> f64 {
        self.pulse_energy_mean
    }

    pub fn pulse_energy_variation(&self) -> &Variation {
        &self.pulse_energy_variation
    }

    /// Pulse energy of the current shot, if one was realized.
    pub fn pulse_energy(&self) -> Option<f64> {
        self.pulse_energy
    }

    /// Advances the pulse energy sampler and makes its value the current
    /// shot's pulse energy.
    pub fn next_shot<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimResult<ShotPulse> {
        let pulse_energy = self
            .pulse_energy_variation
            .next(self.pulse_energy_mean, rng)?;
        self.pulse_energy = Some(pulse_energy);
        tracing::debug!(pulse_energy, "realized pulse");
        Ok(ShotPulse {
            pulse_energy,
            wavelength: self.wavelength(),
        })
    }

    /// Fluence of the current shot at `position` (m, beam along x).
    pub fn intensity_at(&self, position: [f64; 3], unit: IntensityUnit) -> SimResult<f64> {
        let pulse_energy = self.pulse_energy.ok_or_else(|| {
            SimError::computation(
                "RUN.NO_PULSE",
                "no pulse realized yet; call next_shot before intensity_at",
            )
        })?;
        let radius = position[1].hypot(position[2]);
        let fluence = self.profile.normalized_density(radius) * pulse_energy;
        Ok(match unit {
            IntensityUnit::JoulePerSquareMeter => fluence,
            IntensityUnit::PhotonsPerSquareMeter => fluence / self.photon.energy(EnergyUnit::Joule),
            IntensityUnit::JoulePerSquareMicron => fluence * 1.0e-12,
            IntensityUnit::MillijoulePerSquareMicron => fluence * 1.0e-9,
        })
    }
}

impl FromSection for Source {
    const KEYWORDS: KeywordSpec = SOURCE_KEYWORDS;

    fn from_checked(section: CheckedSection<'_>) -> ConfigResult<Self> {
        let photon = Photon::from_keywords(
            section.optional_number("wavelength")?,
            section.optional_number("photon_energy")?,
            section.optional_number("photon_energy_eV")?,
        )?;

        let model = match section.optional_text("profile_model")? {
            Some(name) => name.parse::<ProfileModel>().map_err(|_| {
                section.invalid_choice(
                    "profile_model",
                    name,
                    &ProfileModel::ALL.map(ProfileModel::as_str),
                )
            })?,
            None => ProfileModel::None,
        };
        let profile = PulseProfile::new(model, section.positive_number("focus_diameter")?)?;

        let (keyword, value) = section.alternative(&["pulse_energy_mean", "pulse_energy"])?;
        let pulse_energy_mean = section.expect_number(keyword, value)?;
        let pulse_energy_mean = section.ensure_positive(keyword, pulse_energy_mean)?;

        let variation = Variation::from_section(&section, VariedQuantity::PulseEnergy)?;
        Self::new(photon, profile, pulse_energy_mean, variation)
    }
}

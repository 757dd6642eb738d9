use crate::common::constants::{ELEMENTARY_CHARGE, HC, TWO_PI};
use crate::domain::{ConfigResult, EnergyUnit, SimError};

/// A monochromatic photon, stored by its energy in Joules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    energy: f64,
}

impl Photon {
    pub fn from_wavelength(wavelength: f64) -> ConfigResult<Self> {
        let wavelength = ensure_positive("wavelength", wavelength)?;
        Self::from_joules(HC / wavelength)
    }

    pub fn from_energy(energy: f64, unit: EnergyUnit) -> ConfigResult<Self> {
        let energy = ensure_positive("energy", energy)?;
        match unit {
            EnergyUnit::Joule => Self::from_joules(energy),
            EnergyUnit::ElectronVolt => Self::from_joules(energy * ELEMENTARY_CHARGE),
        }
    }

    /// Builds a photon from exactly one of wavelength [m], energy [J] and
    /// energy [eV].
    pub fn from_keywords(
        wavelength: Option<f64>,
        energy: Option<f64>,
        energy_ev: Option<f64>,
    ) -> ConfigResult<Self> {
        match (wavelength, energy, energy_ev) {
            (Some(wavelength), None, None) => Self::from_wavelength(wavelength),
            (None, Some(energy), None) => Self::from_energy(energy, EnergyUnit::Joule),
            (None, None, Some(energy)) => Self::from_energy(energy, EnergyUnit::ElectronVolt),
            (None, None, None) => Err(SimError::configuration(
                "CONFIG.PHOTON",
                "photon needs a wavelength, an energy in J or an energy in eV",
            )),
            _ => Err(SimError::configuration(
                "CONFIG.PHOTON",
                "photon accepts only one of wavelength, energy in J and energy in eV",
            )),
        }
    }

    fn from_joules(energy: f64) -> ConfigResult<Self> {
        let energy = ensure_positive("energy", energy)?;
        Ok(Self { energy })
    }

    pub fn energy(&self, unit: EnergyUnit) -> f64 {
        match unit {
            EnergyUnit::Joule => self.energy,
            EnergyUnit::ElectronVolt => self.energy / ELEMENTARY_CHARGE,
        }
    }

    pub fn wavelength(&self) -> f64 {
        HC / self.energy
    }

    /// `2π/λ` in 1/m.
    pub fn wavenumber(&self) -> f64 {
        TWO_PI / self.wavelength()
    }
}

fn ensure_positive(quantity: &str, value: f64) -> ConfigResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SimError::configuration(
            "CONFIG.INVALID_VALUE",
            format!("photon {} must be finite and > 0, got {}", quantity, value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::Photon;
    use crate::domain::EnergyUnit;

    #[test]
    fn wavelength_roundtrip_is_exact_within_tolerance() {
        for wavelength in [1.0e-12, 1.0e-10, 2.5e-9, 1.0e-6] {
            let photon = Photon::from_wavelength(wavelength).expect("valid wavelength");
            assert!((photon.wavelength() - wavelength).abs() <= 1.0e-14 * wavelength);
        }
    }

    #[test]
    fn electron_volt_and_joule_energies_agree() {
        let photon = Photon::from_energy(12_398.419_843, EnergyUnit::ElectronVolt)
            .expect("valid energy");
        assert!((photon.wavelength() - 1.0e-10).abs() < 1.0e-18);
        let joules = photon.energy(EnergyUnit::Joule);
        let same = Photon::from_energy(joules, EnergyUnit::Joule).expect("valid energy");
        assert!((same.energy(EnergyUnit::ElectronVolt) - 12_398.419_843).abs() < 1.0e-8);
    }

    #[test]
    fn exactly_one_constructor_keyword_is_accepted() {
        assert!(Photon::from_keywords(Some(1.0e-10), None, None).is_ok());
        assert!(Photon::from_keywords(None, None, Some(8_000.0)).is_ok());

        let error = Photon::from_keywords(None, None, None).expect_err("no keyword");
        assert_eq!(error.placeholder(), "CONFIG.PHOTON");
        let error =
            Photon::from_keywords(Some(1.0e-10), Some(1.0e-15), None).expect_err("two keywords");
        assert_eq!(error.placeholder(), "CONFIG.PHOTON");
    }

    #[test]
    fn non_positive_values_are_rejected() {
        for value in [0.0, -1.0e-10, f64::NAN, f64::INFINITY] {
            let error = Photon::from_wavelength(value).expect_err("invalid wavelength");
            assert!(error.is_configuration());
        }
        assert!(Photon::from_energy(-5.0, EnergyUnit::ElectronVolt).is_err());
    }
}

//! Physical constants in SI units (CODATA 2018 exact or recommended values).
//!
//! Shared by the photon, source and sample models so that no module carries
//! its own literal constants.

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
pub const PLANCK: f64 = 6.626_070_15e-34;
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;
pub const CLASSICAL_ELECTRON_RADIUS: f64 = 2.817_940_326_2e-15;
pub const AVOGADRO: f64 = 6.022_140_76e23;
/// Unified atomic mass unit in kg.
pub const ATOMIC_MASS_UNIT: f64 = 1.660_539_066_60e-27;

pub const PI: f64 = std::f64::consts::PI;
pub const TWO_PI: f64 = 2.0 * PI;

/// `h·c` in J·m, the product used for every energy/wavelength conversion.
pub const HC: f64 = PLANCK * SPEED_OF_LIGHT;

#[cfg(test)]
mod tests {
    use super::{
        ATOMIC_MASS_UNIT, AVOGADRO, CLASSICAL_ELECTRON_RADIUS, ELEMENTARY_CHARGE, HC, PLANCK,
        SPEED_OF_LIGHT,
    };

    #[test]
    fn constants_match_expected_relationships() {
        assert!((HC - PLANCK * SPEED_OF_LIGHT).abs() <= f64::EPSILON * HC);
        // 1 g/mol of atoms weighs 1 g.
        assert!((ATOMIC_MASS_UNIT * AVOGADRO * 1.0e3 - 1.0).abs() < 1.0e-9);
        // 12.398 keV <-> 1 Angstrom.
        let wavelength = HC / (12_398.419_843 * ELEMENTARY_CHARGE);
        assert!((wavelength - 1.0e-10).abs() < 1.0e-18);
    }

    #[test]
    fn physics_constants_remain_finite_and_positive() {
        for value in [
            SPEED_OF_LIGHT,
            PLANCK,
            ELEMENTARY_CHARGE,
            CLASSICAL_ELECTRON_RADIUS,
            AVOGADRO,
            ATOMIC_MASS_UNIT,
        ] {
            assert!(value.is_finite());
            assert!(value > 0.0);
        }
    }
}

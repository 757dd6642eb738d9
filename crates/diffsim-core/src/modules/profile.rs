use crate::common::constants::PI;
use crate::domain::{ConfigResult, SimError};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const FWHM_PER_GAUSSIAN_SIGMA: f64 = 2.354_820_045_030_949_3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProfileModel {
    #[default]
    None,
    TopHat,
    PseudoLorentzian,
    Gaussian,
}

impl ProfileModel {
    pub const ALL: [ProfileModel; 4] = [
        Self::None,
        Self::TopHat,
        Self::PseudoLorentzian,
        Self::Gaussian,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TopHat => "top_hat",
            Self::PseudoLorentzian => "pseudo_lorentzian",
            Self::Gaussian => "gaussian",
        }
    }
}

impl FromStr for ProfileModel {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == name)
            .ok_or_else(|| {
                SimError::configuration(
                    "CONFIG.INVALID_CHOICE",
                    format!(
                        "'{}' is not a pulse profile model (expected one of: {})",
                        name,
                        Self::ALL.map(Self::as_str).join(", ")
                    ),
                )
            })
    }
}

impl Display for ProfileModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Radial fluence distribution of the focused beam.
///
/// `focus_diameter` is the hard-edge diameter for `none` and `top_hat` and the
/// full width at half maximum for the two peaked models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseProfile {
    model: ProfileModel,
    focus_diameter: f64,
}

impl PulseProfile {
    pub fn new(model: ProfileModel, focus_diameter: f64) -> ConfigResult<Self> {
        if !(focus_diameter.is_finite() && focus_diameter > 0.0) {
            return Err(SimError::configuration(
                "CONFIG.INVALID_VALUE",
                format!("focus diameter must be finite and > 0, got {}", focus_diameter),
            ));
        }
        Ok(Self {
            model,
            focus_diameter,
        })
    }

    pub fn model(&self) -> ProfileModel {
        self.model
    }

    pub fn focus_diameter(&self) -> f64 {
        self.focus_diameter
    }

    /// Width parameter of the peaked models.
    pub fn sigma(&self) -> f64 {
        match self.model {
            ProfileModel::Gaussian => self.focus_diameter / FWHM_PER_GAUSSIAN_SIGMA,
            _ => self.focus_diameter / 2.0,
        }
    }

    /// Areal density at radial distance `radius` from the beam axis, in 1/m².
    pub fn normalized_density(&self, radius: f64) -> f64 {
        let radius = radius.abs();
        let focus_radius = self.focus_diameter / 2.0;
        let disk = 1.0 / (PI * focus_radius * focus_radius);
        match self.model {
            ProfileModel::None => disk,
            ProfileModel::TopHat => {
                if radius < focus_radius {
                    disk
                } else {
                    0.0
                }
            }
            ProfileModel::PseudoLorentzian => {
                let sigma = self.sigma();
                let reduced = radius * radius / (sigma * sigma);
                (1.0 + reduced).powf(-1.5) / (2.0 * PI * sigma * sigma)
            }
            ProfileModel::Gaussian => {
                let sigma = self.sigma();
                (-radius * radius / (2.0 * sigma * sigma)).exp() / (2.0 * PI * sigma * sigma)
            }
        }
    }

    /// Fraction of the pulse inside a disk of `radius` around the axis.
    /// For `none` the fraction keeps growing past the nominal focus.
    pub fn encircled_fraction(&self, radius: f64) -> f64 {
        let radius = radius.abs();
        let focus_radius = self.focus_diameter / 2.0;
        match self.model {
            ProfileModel::None => (radius / focus_radius).powi(2),
            ProfileModel::TopHat => (radius / focus_radius).powi(2).min(1.0),
            ProfileModel::PseudoLorentzian => {
                let sigma = self.sigma();
                1.0 - 1.0 / (1.0 + radius * radius / (sigma * sigma)).sqrt()
            }
            ProfileModel::Gaussian => {
                let sigma = self.sigma();
                1.0 - (-radius * radius / (2.0 * sigma * sigma)).exp()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProfileModel, PulseProfile};
    use crate::common::constants::TWO_PI;
    use crate::numerics::{integrate_midpoint, integrate_radial_density};

    const FOCUS: f64 = 1.0e-6;

    #[test]
    fn peaked_profiles_integrate_to_one_over_the_plane() {
        for model in [ProfileModel::PseudoLorentzian, ProfileModel::Gaussian] {
            let profile = PulseProfile::new(model, FOCUS).expect("valid profile");
            let total = integrate_radial_density(
                |radius| profile.normalized_density(radius),
                profile.sigma(),
                20_000,
            )
            .expect("integral");
            assert!((total - 1.0).abs() < 1.0e-6, "{model}: {total}");
        }
    }

    #[test]
    fn flat_profiles_integrate_to_one_over_the_focus_disk() {
        for model in [ProfileModel::None, ProfileModel::TopHat] {
            let profile = PulseProfile::new(model, FOCUS).expect("valid profile");
            let total = integrate_midpoint(
                |radius| TWO_PI * radius * profile.normalized_density(radius),
                0.0,
                FOCUS / 2.0,
                1_000,
            )
            .expect("integral");
            assert!((total - 1.0).abs() < 1.0e-9, "{model}: {total}");
        }

        let top_hat = PulseProfile::new(ProfileModel::TopHat, FOCUS).expect("valid profile");
        assert_eq!(top_hat.normalized_density(FOCUS), 0.0);
        let none = PulseProfile::new(ProfileModel::None, FOCUS).expect("valid profile");
        assert_eq!(none.normalized_density(FOCUS), none.normalized_density(0.0));
    }

    #[test]
    fn encircled_fraction_matches_numerical_integral() {
        for model in ProfileModel::ALL {
            let profile = PulseProfile::new(model, FOCUS).expect("valid profile");
            let radius = 0.4 * FOCUS;
            let numeric = integrate_midpoint(
                |r| TWO_PI * r * profile.normalized_density(r),
                0.0,
                radius,
                4_000,
            )
            .expect("integral");
            let analytic = profile.encircled_fraction(radius);
            assert!((numeric - analytic).abs() < 1.0e-6, "{model}: {numeric} vs {analytic}");
        }
    }

    #[test]
    fn gaussian_width_is_the_full_width_at_half_maximum() {
        let profile = PulseProfile::new(ProfileModel::Gaussian, FOCUS).expect("valid profile");
        let ratio = profile.normalized_density(FOCUS / 2.0) / profile.normalized_density(0.0);
        assert!((ratio - 0.5).abs() < 1.0e-12);
    }

    #[test]
    fn unknown_profile_models_are_rejected() {
        assert_eq!("top_hat".parse::<ProfileModel>().ok(), Some(ProfileModel::TopHat));
        let error = "lorentzian".parse::<ProfileModel>().expect_err("unknown model");
        assert_eq!(error.placeholder(), "CONFIG.INVALID_CHOICE");
        assert!(PulseProfile::new(ProfileModel::Gaussian, 0.0).is_err());
    }
}

use crate::domain::{CheckedSection, ConfigResult, KeywordError};
use crate::numerics::{EulerAngles, Orientation};
use rand::Rng;

pub(crate) const ALIGNMENT_KEYWORDS: [&str; 4] =
    ["alignment", "euler_angle_0", "euler_angle_1", "euler_angle_2"];

const EULER_ANGLE_KEYWORDS: [&str; 3] = ["euler_angle_0", "euler_angle_1", "euler_angle_2"];

/// How a particle is oriented for each shot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Alignment {
    /// Uniformly distributed over all orientations.
    #[default]
    Random,
    /// Uniformly distributed rotation about the beam axis.
    FirstAxis,
    /// The same configured orientation for every shot.
    Fixed(EulerAngles),
}

impl Alignment {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::FirstAxis => "first_axis",
            Self::Fixed(_) => "euler_angles",
        }
    }

    pub fn from_section(section: &CheckedSection<'_>) -> ConfigResult<Self> {
        let given: Vec<&str> = EULER_ANGLE_KEYWORDS
            .into_iter()
            .filter(|keyword| section.contains(keyword))
            .collect();
        let name = section.optional_text("alignment")?.unwrap_or("random");
        match name {
            "random" | "first_axis" => {
                if !given.is_empty() {
                    return Err(KeywordError::Illegal {
                        section: section.name(),
                        keywords: given.into_iter().map(str::to_string).collect(),
                    }
                    .into());
                }
                Ok(if name == "random" {
                    Self::Random
                } else {
                    Self::FirstAxis
                })
            }
            "euler_angles" => {
                let missing: Vec<String> = EULER_ANGLE_KEYWORDS
                    .into_iter()
                    .filter(|keyword| !section.contains(keyword))
                    .map(str::to_string)
                    .collect();
                if !missing.is_empty() {
                    return Err(KeywordError::Missing {
                        section: section.name(),
                        keywords: missing,
                    }
                    .into());
                }
                Ok(Self::Fixed(EulerAngles::new(
                    section.number("euler_angle_0")?,
                    section.number("euler_angle_1")?,
                    section.number("euler_angle_2")?,
                )))
            }
            other => Err(section.invalid_choice(
                "alignment",
                other,
                &["random", "first_axis", "euler_angles"],
            )),
        }
    }

    pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> Orientation {
        match self {
            Self::Random => Orientation::random(rng),
            Self::FirstAxis => Orientation::random_about_beam_axis(rng),
            Self::Fixed(angles) => Orientation::from_euler_angles(*angles),
        }
    }
}

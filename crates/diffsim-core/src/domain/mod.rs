pub mod config;
pub mod errors;

pub use config::{
    CheckedSection, ConfigSection, ConfigValue, Configuration, DETECTOR_SECTION, FromSection,
    KeywordError, KeywordSpec, RECOGNIZED_SECTIONS, SAMPLE_SECTION, SIMULATION_SECTION,
    SOURCE_SECTION, check_keywords, parse_section,
};
pub use errors::{ConfigResult, SimError, SimErrorCategory, SimResult};

use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnergyUnit {
    #[default]
    Joule,
    ElectronVolt,
}

impl EnergyUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Joule => "J",
            Self::ElectronVolt => "eV",
        }
    }
}

impl FromStr for EnergyUnit {
    type Err = SimError;

    fn from_str(unit: &str) -> Result<Self, Self::Err> {
        match unit {
            "J" => Ok(Self::Joule),
            "eV" => Ok(Self::ElectronVolt),
            other => Err(invalid_unit(other, &["J", "eV"])),
        }
    }
}

/// Units in which a pulse fluence can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntensityUnit {
    JoulePerSquareMeter,
    #[default]
    PhotonsPerSquareMeter,
    JoulePerSquareMicron,
    MillijoulePerSquareMicron,
}

impl IntensityUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JoulePerSquareMeter => "J/m2",
            Self::PhotonsPerSquareMeter => "ph/m2",
            Self::JoulePerSquareMicron => "J/um2",
            Self::MillijoulePerSquareMicron => "mJ/um2",
        }
    }
}

impl FromStr for IntensityUnit {
    type Err = SimError;

    fn from_str(unit: &str) -> Result<Self, Self::Err> {
        match unit {
            "J/m2" => Ok(Self::JoulePerSquareMeter),
            "ph/m2" => Ok(Self::PhotonsPerSquareMeter),
            "J/um2" => Ok(Self::JoulePerSquareMicron),
            "mJ/um2" => Ok(Self::MillijoulePerSquareMicron),
            other => Err(invalid_unit(other, &["J/m2", "ph/m2", "J/um2", "mJ/um2"])),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelSizeMode {
    Raw,
    #[default]
    Binned,
}

impl PixelSizeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Binned => "binned",
        }
    }
}

impl FromStr for PixelSizeMode {
    type Err = SimError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "raw" | "unbinned" => Ok(Self::Raw),
            "binned" => Ok(Self::Binned),
            other => Err(SimError::configuration(
                "CONFIG.INVALID_CHOICE",
                format!("'{}' is not a pixel size mode (expected raw or binned)", other),
            )),
        }
    }
}

impl Display for EnergyUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl Display for IntensityUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

fn invalid_unit(unit: &str, expected: &[&str]) -> SimError {
    SimError::configuration(
        "CONFIG.INVALID_UNIT",
        format!(
            "'{}' is not a valid unit (expected one of: {})",
            unit,
            expected.join(", ")
        ),
    )
}

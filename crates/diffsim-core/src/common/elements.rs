//! Element data tables: atomic numbers, atomic masses and tabulated atomic
//! scattering factors keyed by element symbol.
//!
//! Tables are loaded once (from JSON or the built-in set) and handed to the
//! sample constructors by reference; nothing reads them through ambient state.

use crate::domain::{SimError, SimResult};
use crate::numerics::interpolate_linear;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// One element. `scattering_factors` rows are `[photon energy in eV, f1, f2]`
/// sorted by energy; an empty table means `f1 = Z, f2 = 0`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ElementData {
    pub atomic_number: u32,
    /// Atomic mass in unified atomic mass units (g/mol).
    pub atomic_mass: f64,
    #[serde(default)]
    pub scattering_factors: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ElementTables {
    elements: BTreeMap<String, ElementData>,
}

#[derive(Debug, thiserror::Error)]
pub enum ElementTableError {
    #[error("failed to read element tables '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse element tables: {source}")]
    Parse { source: serde_json::Error },
    #[error("element '{symbol}' has an invalid entry: {reason}")]
    Invalid { symbol: String, reason: String },
}

impl From<ElementTableError> for SimError {
    fn from(error: ElementTableError) -> Self {
        match error {
            ElementTableError::Read { .. } => {
                SimError::io_system("IO.ELEMENT_TABLES", error.to_string())
            }
            ElementTableError::Parse { .. } | ElementTableError::Invalid { .. } => {
                SimError::configuration("CONFIG.ELEMENT_TABLES", error.to_string())
            }
        }
    }
}

// Symbol, Z, atomic mass [u].
const BUILTIN_ELEMENTS: [(&str, u32, f64); 7] = [
    ("H", 1, 1.008),
    ("C", 6, 12.011),
    ("N", 7, 14.007),
    ("O", 8, 15.999),
    ("P", 15, 30.974),
    ("S", 16, 32.06),
    ("Au", 79, 196.967),
];

static BUILTIN_TABLES: OnceLock<ElementTables> = OnceLock::new();

impl ElementTables {
    pub fn new(elements: BTreeMap<String, ElementData>) -> Result<Self, ElementTableError> {
        let tables = Self { elements };
        tables.validate()?;
        Ok(tables)
    }

    /// Process-wide built-in tables in the non-resonant forward-scattering
    /// limit. Initialized on first use and read-only afterwards.
    pub fn builtin() -> &'static ElementTables {
        BUILTIN_TABLES.get_or_init(|| {
            let elements = BUILTIN_ELEMENTS
                .iter()
                .map(|(symbol, atomic_number, atomic_mass)| {
                    (
                        symbol.to_string(),
                        ElementData {
                            atomic_number: *atomic_number,
                            atomic_mass: *atomic_mass,
                            scattering_factors: Vec::new(),
                        },
                    )
                })
                .collect();
            Self { elements }
        })
    }

    pub fn from_json_str(source: &str) -> Result<Self, ElementTableError> {
        #[derive(Deserialize)]
        struct TableFile {
            elements: BTreeMap<String, ElementData>,
        }

        let file: TableFile =
            serde_json::from_str(source).map_err(|source| ElementTableError::Parse { source })?;
        Self::new(file.elements)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ElementTableError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ElementTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, symbol: &str) -> Option<&ElementData> {
        let symbol = symbol.trim();
        self.elements.get(symbol).or_else(|| {
            self.elements
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(symbol))
                .map(|(_, data)| data)
        })
    }

    pub fn atomic_number(&self, symbol: &str) -> Option<u32> {
        self.element(symbol).map(|data| data.atomic_number)
    }

    pub fn atomic_mass(&self, symbol: &str) -> Option<f64> {
        self.element(symbol).map(|data| data.atomic_mass)
    }

    /// Complex atomic scattering factor `f1 + i f2` at `photon_energy_ev`,
    /// linearly interpolated and clamped at the ends of the table.
    pub fn scattering_factor(&self, symbol: &str, photon_energy_ev: f64) -> SimResult<Complex64> {
        let data = self
            .element(symbol)
            .ok_or_else(|| unknown_element(symbol))?;
        if data.scattering_factors.is_empty() {
            return Ok(Complex64::new(f64::from(data.atomic_number), 0.0));
        }

        let energies: Vec<f64> = data.scattering_factors.iter().map(|row| row[0]).collect();
        let f1: Vec<f64> = data.scattering_factors.iter().map(|row| row[1]).collect();
        let f2: Vec<f64> = data.scattering_factors.iter().map(|row| row[2]).collect();
        if energies.len() == 1 {
            return Ok(Complex64::new(f1[0], f2[0]));
        }

        let re = interpolate_linear(photon_energy_ev, &energies, &f1);
        let im = interpolate_linear(photon_energy_ev, &energies, &f2);
        match (re, im) {
            (Some(re), Some(im)) => Ok(Complex64::new(re, im)),
            _ => Err(SimError::internal(
                "SYS.ELEMENT_INTERPOLATION",
                format!("scattering factor table of '{}' is not interpolable", symbol),
            )),
        }
    }

    fn validate(&self) -> Result<(), ElementTableError> {
        for (symbol, data) in &self.elements {
            let invalid = |reason: &str| ElementTableError::Invalid {
                symbol: symbol.clone(),
                reason: reason.to_string(),
            };
            if data.atomic_number == 0 {
                return Err(invalid("atomic number must be >= 1"));
            }
            if !(data.atomic_mass.is_finite() && data.atomic_mass > 0.0) {
                return Err(invalid("atomic mass must be finite and > 0"));
            }
            if data
                .scattering_factors
                .iter()
                .flatten()
                .any(|value| !value.is_finite())
            {
                return Err(invalid("scattering factors must be finite"));
            }
            if !data
                .scattering_factors
                .windows(2)
                .all(|window| window[0][0] < window[1][0])
            {
                return Err(invalid(
                    "scattering factor energies must be strictly increasing",
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn unknown_element(symbol: &str) -> SimError {
    SimError::configuration(
        "CONFIG.UNKNOWN_ELEMENT",
        format!("element '{}' is not present in the element tables", symbol),
    )
}

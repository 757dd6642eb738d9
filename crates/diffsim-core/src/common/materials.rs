//! Sample materials: stoichiometry plus mass density, reduced to a complex
//! scattering density (electrons per m³) at a given photon energy.

use super::constants::ATOMIC_MASS_UNIT;
use super::elements::{ElementTables, unknown_element};
use crate::domain::{SimError, SimResult};
use num_complex::Complex64;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialType {
    Water,
    Protein,
    Dna,
    Lipid,
    Cell,
    Virus,
    Latexball,
    Gold,
}

impl MaterialType {
    pub const ALL: [MaterialType; 8] = [
        Self::Water,
        Self::Protein,
        Self::Dna,
        Self::Lipid,
        Self::Cell,
        Self::Virus,
        Self::Latexball,
        Self::Gold,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Protein => "protein",
            Self::Dna => "dna",
            Self::Lipid => "lipid",
            Self::Cell => "cell",
            Self::Virus => "virus",
            Self::Latexball => "latexball",
            Self::Gold => "gold",
        }
    }

    /// Mass density in kg/m³.
    pub const fn mass_density(self) -> f64 {
        match self {
            Self::Water => 995.0,
            Self::Protein => 1_350.0,
            Self::Dna => 1_700.0,
            Self::Lipid => 1_000.0,
            Self::Cell => 1_000.0,
            Self::Virus => 1_455.0,
            Self::Latexball => 1_050.0,
            Self::Gold => 19_320.0,
        }
    }

    /// Relative atom counts per formula unit.
    pub const fn composition(self) -> &'static [(&'static str, f64)] {
        match self {
            Self::Water => &[("H", 2.0), ("O", 1.0)],
            Self::Protein => &[("H", 86.0), ("C", 52.0), ("N", 13.0), ("O", 15.0), ("S", 1.0)],
            Self::Dna => &[("H", 11.0), ("C", 10.0), ("N", 4.0), ("O", 6.0), ("P", 1.0)],
            Self::Lipid => &[("H", 69.0), ("C", 36.0), ("O", 6.0), ("P", 1.0)],
            Self::Cell => &[("H", 23.0), ("C", 3.0), ("N", 1.0), ("O", 10.0), ("S", 1.0)],
            Self::Virus => &[
                ("H", 72.43),
                ("C", 47.52),
                ("N", 13.55),
                ("O", 17.17),
                ("P", 1.11),
                ("S", 0.7),
            ],
            Self::Latexball => &[("H", 8.0), ("C", 8.0)],
            Self::Gold => &[("Au", 1.0)],
        }
    }
}

impl FromStr for MaterialType {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|material| material.as_str() == name)
            .ok_or_else(|| {
                let choices: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                SimError::configuration(
                    "CONFIG.INVALID_CHOICE",
                    format!(
                        "material_type '{}' is not known (expected one of: {})",
                        name,
                        choices.join(", ")
                    ),
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    composition: Vec<(String, f64)>,
    mass_density: f64,
}

impl Material {
    pub fn from_type(material_type: MaterialType) -> Self {
        Self {
            composition: material_type
                .composition()
                .iter()
                .map(|(symbol, count)| (symbol.to_string(), *count))
                .collect(),
            mass_density: material_type.mass_density(),
        }
    }

    pub fn custom(composition: Vec<(String, f64)>, mass_density: f64) -> SimResult<Self> {
        if composition.is_empty() {
            return Err(SimError::configuration(
                "CONFIG.INVALID_VALUE",
                "atomic composition must name at least one element",
            ));
        }
        if let Some((symbol, count)) = composition
            .iter()
            .find(|(_, count)| !(count.is_finite() && *count >= 0.0))
        {
            return Err(SimError::configuration(
                "CONFIG.INVALID_VALUE",
                format!("atomic count of '{}' must be finite and >= 0, got {}", symbol, count),
            ));
        }
        if composition.iter().all(|(_, count)| *count == 0.0) {
            return Err(SimError::configuration(
                "CONFIG.INVALID_VALUE",
                "atomic composition must contain a non-zero count",
            ));
        }
        if !(mass_density.is_finite() && mass_density > 0.0) {
            return Err(SimError::configuration(
                "CONFIG.INVALID_VALUE",
                format!("massdensity must be finite and > 0, got {}", mass_density),
            ));
        }
        Ok(Self {
            composition,
            mass_density,
        })
    }

    pub fn composition(&self) -> &[(String, f64)] {
        &self.composition
    }

    pub fn mass_density(&self) -> f64 {
        self.mass_density
    }

    /// Complex scattering density `Σ n_i f_i(E)` in electrons per m³.
    pub fn scattering_density(
        &self,
        tables: &ElementTables,
        photon_energy_ev: f64,
    ) -> SimResult<Complex64> {
        let mut formula_mass = 0.0;
        let mut formula_factor = Complex64::new(0.0, 0.0);
        for (symbol, count) in &self.composition {
            let mass = tables
                .atomic_mass(symbol)
                .ok_or_else(|| unknown_element(symbol))?;
            formula_mass += count * mass;
            formula_factor += tables.scattering_factor(symbol, photon_energy_ev)? * *count;
        }

        let formula_units_per_volume = self.mass_density / (formula_mass * ATOMIC_MASS_UNIT);
        Ok(formula_factor * formula_units_per_volume)
    }

    pub fn electron_density(&self, tables: &ElementTables) -> SimResult<f64> {
        let mut formula_mass = 0.0;
        let mut electrons = 0.0;
        for (symbol, count) in &self.composition {
            let data = tables
                .element(symbol)
                .ok_or_else(|| unknown_element(symbol))?;
            formula_mass += count * data.atomic_mass;
            electrons += count * f64::from(data.atomic_number);
        }
        Ok(electrons * self.mass_density / (formula_mass * ATOMIC_MASS_UNIT))
    }
}

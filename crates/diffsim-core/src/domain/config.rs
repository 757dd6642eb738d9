//! Configuration model and the keyword validator every component shares.
//!
//! A configuration is a map of sections (`source`, `sample`, `detector`,
//! `simulation`), each a map of keyword to value. Components declare the
//! keywords they accept through a [`KeywordSpec`] and are built from a section
//! through [`parse_section`], which rejects missing, illegal and conflicting
//! keywords before any typed value is read.

use super::errors::{ConfigResult, SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const SOURCE_SECTION: &str = "source";
pub const SAMPLE_SECTION: &str = "sample";
pub const DETECTOR_SECTION: &str = "detector";
pub const SIMULATION_SECTION: &str = "simulation";

// 2^53
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub const RECOGNIZED_SECTIONS: [&str; 4] = [
    SOURCE_SECTION,
    SAMPLE_SECTION,
    DETECTOR_SECTION,
    SIMULATION_SECTION,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    // Tried before `Number` so whole JSON numbers keep every bit.
    Integer(u64),
    Number(f64),
    Text(String),
    List(Vec<ConfigValue>),
    Table(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Non-negative whole value. Floats are accepted only while they are
    /// exactly representable, so no integer is ever rounded on the way in.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Number(value)
                if *value >= 0.0 && value.fract() == 0.0 && *value <= MAX_EXACT_FLOAT_INTEGER =>
            {
                Some(*value as u64)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            Self::Table(entries) => Some(entries),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) | Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Table(_) => "table",
        }
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for ConfigValue {
    fn from(value: u64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(values: Vec<ConfigValue>) -> Self {
        Self::List(values)
    }
}

impl From<BTreeMap<String, ConfigValue>> for ConfigValue {
    fn from(entries: BTreeMap<String, ConfigValue>) -> Self {
        Self::Table(entries)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSection {
    entries: BTreeMap<String, ConfigValue>,
}

impl ConfigSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, keyword: &str, value: impl Into<ConfigValue>) -> Self {
        self.insert(keyword, value);
        self
    }

    pub fn insert(&mut self, keyword: &str, value: impl Into<ConfigValue>) {
        self.entries.insert(keyword.to_string(), value.into());
    }

    pub fn remove(&mut self, keyword: &str) -> Option<ConfigValue> {
        self.entries.remove(keyword)
    }

    pub fn get(&self, keyword: &str) -> Option<&ConfigValue> {
        self.entries.get(keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable simulation configuration, keyed by section name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    sections: BTreeMap<String, ConfigSection>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(source: &str) -> ConfigResult<Self> {
        serde_json::from_str(source).map_err(|error| {
            SimError::configuration(
                "CONFIG.PARSE",
                format!("failed to parse configuration: {}", error),
            )
        })
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|error| {
            SimError::io_system(
                "IO.CONFIG_READ",
                format!(
                    "failed to read configuration '{}': {}",
                    path.display(),
                    error
                ),
            )
        })?;
        Self::from_json_str(&source)
    }

    /// Documented defaults. Only optional keywords valid for every variant of
    /// a component appear here; required physical quantities never do.
    pub fn defaults() -> Self {
        Self::new()
            .with_section(
                SOURCE_SECTION,
                ConfigSection::new()
                    .with("pulse_energy_variation", "none")
                    .with("profile_model", "none"),
            )
            .with_section(
                DETECTOR_SECTION,
                ConfigSection::new()
                    .with("binning", 1_u64)
                    .with("noise", "none"),
            )
            .with_section(
                SAMPLE_SECTION,
                ConfigSection::new().with("number_of_images", 1_u64),
            )
    }

    /// Returns a copy where every keyword absent from `self` is filled from
    /// [`Configuration::defaults`].
    pub fn with_defaults(&self) -> Self {
        let mut merged = Self::defaults();
        for (name, section) in &self.sections {
            let target = merged.sections.entry(name.clone()).or_default();
            for (keyword, value) in &section.entries {
                target.entries.insert(keyword.clone(), value.clone());
            }
        }
        merged
    }

    pub fn with_section(mut self, name: &str, section: ConfigSection) -> Self {
        self.sections.insert(name.to_string(), section);
        self
    }

    pub fn insert_section(&mut self, name: &str, section: ConfigSection) {
        self.sections.insert(name.to_string(), section);
    }

    pub fn set(&mut self, section: &str, keyword: &str, value: impl Into<ConfigValue>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(keyword, value);
    }

    pub fn section(&self, name: &str) -> ConfigResult<&ConfigSection> {
        self.sections.get(name).ok_or_else(|| {
            SimError::configuration(
                "CONFIG.MISSING_SECTION",
                format!("configuration is missing section '{}'", name),
            )
        })
    }

    pub fn optional_section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn validate_section_names(&self) -> ConfigResult<()> {
        let illegal: Vec<&str> = self
            .section_names()
            .filter(|name| !RECOGNIZED_SECTIONS.contains(name))
            .collect();
        if illegal.is_empty() {
            Ok(())
        } else {
            Err(SimError::configuration(
                "CONFIG.ILLEGAL_SECTION",
                format!("unrecognized configuration section(s): {}", illegal.join(", ")),
            ))
        }
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self).map_err(|error| {
            SimError::internal(
                "SYS.CONFIG_SERIALIZE",
                format!("failed to serialize configuration: {}", error),
            )
        })
    }
}

/// Keywords accepted by one component.
///
/// Each entry of `required` is a group of alternatives: exactly one keyword
/// of the group must be present (`["pulse_energy_mean", "pulse_energy"]`).
#[derive(Debug, Clone, Copy)]
pub struct KeywordSpec {
    pub section: &'static str,
    pub required: &'static [&'static [&'static str]],
    pub optional: &'static [&'static str],
}

impl KeywordSpec {
    pub fn accepts(&self, keyword: &str) -> bool {
        self.optional.contains(&keyword)
            || self
                .required
                .iter()
                .any(|group| group.contains(&keyword))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeywordError {
    #[error("section '{section}' is missing required keyword(s): {}", .keywords.join(", "))]
    Missing {
        section: &'static str,
        keywords: Vec<String>,
    },
    #[error("section '{section}' has illegal keyword(s): {}", .keywords.join(", "))]
    Illegal {
        section: &'static str,
        keywords: Vec<String>,
    },
    #[error("section '{section}' accepts only one of: {}", .keywords.join(", "))]
    Conflicting {
        section: &'static str,
        keywords: Vec<String>,
    },
}

impl KeywordError {
    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "CONFIG.MISSING_KEYWORD",
            Self::Illegal { .. } => "CONFIG.ILLEGAL_KEYWORD",
            Self::Conflicting { .. } => "CONFIG.CONFLICTING_KEYWORDS",
        }
    }
}

impl From<KeywordError> for SimError {
    fn from(error: KeywordError) -> Self {
        SimError::configuration(error.placeholder(), error.to_string())
    }
}

pub fn check_keywords(spec: &KeywordSpec, section: &ConfigSection) -> Result<(), KeywordError> {
    let missing: Vec<String> = spec
        .required
        .iter()
        .filter(|group| !group.iter().any(|keyword| section.contains(keyword)))
        .map(|group| group.join("|"))
        .collect();
    if !missing.is_empty() {
        return Err(KeywordError::Missing {
            section: spec.section,
            keywords: missing,
        });
    }

    let illegal: Vec<String> = section
        .keywords()
        .filter(|keyword| !spec.accepts(keyword))
        .map(str::to_string)
        .collect();
    if !illegal.is_empty() {
        return Err(KeywordError::Illegal {
            section: spec.section,
            keywords: illegal,
        });
    }

    for group in spec.required {
        let present: Vec<String> = group
            .iter()
            .filter(|keyword| section.contains(keyword))
            .map(|keyword| keyword.to_string())
            .collect();
        if present.len() > 1 {
            return Err(KeywordError::Conflicting {
                section: spec.section,
                keywords: present,
            });
        }
    }

    Ok(())
}

/// A typed settings struct that can be read from one configuration section.
pub trait FromSection: Sized {
    const KEYWORDS: KeywordSpec;

    fn from_checked(section: CheckedSection<'_>) -> ConfigResult<Self>;
}

pub fn parse_section<T: FromSection>(section: &ConfigSection) -> ConfigResult<T> {
    check_keywords(&T::KEYWORDS, section)?;
    T::from_checked(CheckedSection {
        name: T::KEYWORDS.section,
        section,
    })
}

/// Read access to a section whose keyword set has already been validated.
#[derive(Debug, Clone, Copy)]
pub struct CheckedSection<'a> {
    name: &'static str,
    section: &'a ConfigSection,
}

impl<'a> CheckedSection<'a> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.section.contains(keyword)
    }

    /// Returns the keyword of `group` that is present, with its value.
    pub fn alternative(
        &self,
        group: &[&'static str],
    ) -> ConfigResult<(&'static str, &'a ConfigValue)> {
        group
            .iter()
            .find_map(|keyword| self.section.get(keyword).map(|value| (*keyword, value)))
            .ok_or_else(|| {
                KeywordError::Missing {
                    section: self.name,
                    keywords: vec![group.join("|")],
                }
                .into()
            })
    }

    pub fn value(&self, keyword: &str) -> ConfigResult<&'a ConfigValue> {
        self.section.get(keyword).ok_or_else(|| {
            KeywordError::Missing {
                section: self.name,
                keywords: vec![keyword.to_string()],
            }
            .into()
        })
    }

    pub fn number(&self, keyword: &str) -> ConfigResult<f64> {
        let value = self.value(keyword)?;
        self.expect_number(keyword, value)
    }

    pub fn optional_number(&self, keyword: &str) -> ConfigResult<Option<f64>> {
        self.section
            .get(keyword)
            .map(|value| self.expect_number(keyword, value))
            .transpose()
    }

    pub fn positive_number(&self, keyword: &str) -> ConfigResult<f64> {
        let value = self.number(keyword)?;
        self.ensure_positive(keyword, value)
    }

    pub fn optional_positive_number(&self, keyword: &str) -> ConfigResult<Option<f64>> {
        self.optional_number(keyword)?
            .map(|value| self.ensure_positive(keyword, value))
            .transpose()
    }

    pub fn text(&self, keyword: &str) -> ConfigResult<&'a str> {
        let value = self.value(keyword)?;
        self.expect_text(keyword, value)
    }

    pub fn optional_text(&self, keyword: &str) -> ConfigResult<Option<&'a str>> {
        self.section
            .get(keyword)
            .map(|value| self.expect_text(keyword, value))
            .transpose()
    }

    pub fn unsigned(&self, keyword: &str) -> ConfigResult<u64> {
        let value = self.value(keyword)?;
        self.expect_unsigned(keyword, value)
    }

    pub fn optional_unsigned(&self, keyword: &str) -> ConfigResult<Option<u64>> {
        self.section
            .get(keyword)
            .map(|value| self.expect_unsigned(keyword, value))
            .transpose()
    }

    pub fn count(&self, keyword: &str) -> ConfigResult<usize> {
        let value = self.unsigned(keyword)?;
        self.expect_count(keyword, value)
    }

    pub fn optional_count(&self, keyword: &str) -> ConfigResult<Option<usize>> {
        self.optional_unsigned(keyword)?
            .map(|value| self.expect_count(keyword, value))
            .transpose()
    }

    fn expect_unsigned(&self, keyword: &str, value: &ConfigValue) -> ConfigResult<u64> {
        match value.as_u64() {
            Some(value) => Ok(value),
            None => {
                let number = self.expect_number(keyword, value)?;
                Err(self.invalid_value(keyword, "a non-negative integer", number))
            }
        }
    }

    fn expect_count(&self, keyword: &str, value: u64) -> ConfigResult<usize> {
        usize::try_from(value)
            .map_err(|_| self.invalid_value(keyword, "an addressable count", value as f64))
    }

    pub fn optional_table(
        &self,
        keyword: &str,
    ) -> ConfigResult<Option<&'a BTreeMap<String, ConfigValue>>> {
        self.section
            .get(keyword)
            .map(|value| {
                value.as_table().ok_or_else(|| {
                    self.wrong_kind(keyword, "table", value)
                })
            })
            .transpose()
    }

    pub fn optional_list(&self, keyword: &str) -> ConfigResult<Option<&'a [ConfigValue]>> {
        self.section
            .get(keyword)
            .map(|value| value.as_list().ok_or_else(|| self.wrong_kind(keyword, "list", value)))
            .transpose()
    }

    pub fn expect_number(&self, keyword: &str, value: &ConfigValue) -> ConfigResult<f64> {
        value
            .as_f64()
            .ok_or_else(|| self.wrong_kind(keyword, "number", value))
    }

    pub fn expect_text(&self, keyword: &str, value: &'a ConfigValue) -> ConfigResult<&'a str> {
        value
            .as_str()
            .ok_or_else(|| self.wrong_kind(keyword, "text", value))
    }

    pub fn ensure_positive(&self, keyword: &str, value: f64) -> ConfigResult<f64> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(self.invalid_value(keyword, "a finite value > 0", value))
        }
    }

    pub fn invalid_value(&self, keyword: &str, expected: &str, value: f64) -> SimError {
        SimError::configuration(
            "CONFIG.INVALID_VALUE",
            format!(
                "section '{}' keyword '{}' must be {}, got {}",
                self.name, keyword, expected, value
            ),
        )
    }

    pub fn invalid_choice(&self, keyword: &str, value: &str, choices: &[&str]) -> SimError {
        SimError::configuration(
            "CONFIG.INVALID_CHOICE",
            format!(
                "section '{}' keyword '{}' has unrecognized value '{}' (expected one of: {})",
                self.name,
                keyword,
                value,
                choices.join(", ")
            ),
        )
    }

    fn wrong_kind(&self, keyword: &str, expected: &str, value: &ConfigValue) -> SimError {
        SimError::configuration(
            "CONFIG.INVALID_TYPE",
            format!(
                "section '{}' keyword '{}' must be a {}, got a {}",
                self.name,
                keyword,
                expected,
                value.kind()
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CheckedSection, ConfigResult, ConfigSection, Configuration, FromSection, KeywordError,
        KeywordSpec, check_keywords, parse_section,
    };
    use crate::domain::SimErrorCategory;

    const FOCUS_KEYWORDS: KeywordSpec = KeywordSpec {
        section: "source",
        required: &[&["focus_diameter"], &["pulse_energy_mean", "pulse_energy"]],
        optional: &["profile_model"],
    };

    #[derive(Debug)]
    struct FocusOnly {
        focus_diameter: f64,
        energy_keyword: &'static str,
    }

    impl FromSection for FocusOnly {
        const KEYWORDS: KeywordSpec = FOCUS_KEYWORDS;

        fn from_checked(section: CheckedSection<'_>) -> ConfigResult<Self> {
            let (energy_keyword, _) = section.alternative(&["pulse_energy_mean", "pulse_energy"])?;
            Ok(Self {
                focus_diameter: section.positive_number("focus_diameter")?,
                energy_keyword,
            })
        }
    }

    #[test]
    fn missing_keywords_are_enumerated_with_alternatives() {
        let section = ConfigSection::new().with("profile_model", "gaussian");
        let error = check_keywords(&FOCUS_KEYWORDS, &section).expect_err("keywords are missing");
        assert_eq!(
            error,
            KeywordError::Missing {
                section: "source",
                keywords: vec![
                    "focus_diameter".to_string(),
                    "pulse_energy_mean|pulse_energy".to_string()
                ],
            }
        );
        assert_eq!(error.placeholder(), "CONFIG.MISSING_KEYWORD");
    }

    #[test]
    fn illegal_keywords_are_rejected() {
        let section = ConfigSection::new()
            .with("focus_diameter", 1.0e-6)
            .with("pulse_energy", 1.0e-3)
            .with("photon_flux", 3.0)
            .with("colour", "blue");
        let error = check_keywords(&FOCUS_KEYWORDS, &section).expect_err("illegal keywords");
        assert_eq!(
            error.to_string(),
            "section 'source' has illegal keyword(s): colour, photon_flux"
        );
    }

    #[test]
    fn alternatives_may_not_be_combined() {
        let section = ConfigSection::new()
            .with("focus_diameter", 1.0e-6)
            .with("pulse_energy", 1.0e-3)
            .with("pulse_energy_mean", 1.0e-3);
        let error =
            check_keywords(&FOCUS_KEYWORDS, &section).expect_err("conflicting alternatives");
        assert_eq!(error.placeholder(), "CONFIG.CONFLICTING_KEYWORDS");
    }

    #[test]
    fn parse_section_returns_typed_settings() {
        let section = ConfigSection::new()
            .with("focus_diameter", 2.0e-6)
            .with("pulse_energy", 1.0e-3);
        let settings: FocusOnly = parse_section(&section).expect("valid section");
        assert_eq!(settings.focus_diameter, 2.0e-6);
        assert_eq!(settings.energy_keyword, "pulse_energy");
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let section = ConfigSection::new()
            .with("focus_diameter", -1.0)
            .with("pulse_energy", 1.0e-3);
        let error = parse_section::<FocusOnly>(&section).expect_err("negative diameter");
        assert_eq!(error.category(), SimErrorCategory::Configuration);
        assert_eq!(error.placeholder(), "CONFIG.INVALID_VALUE");

        let section = ConfigSection::new()
            .with("focus_diameter", "wide")
            .with("pulse_energy", 1.0e-3);
        let error = parse_section::<FocusOnly>(&section).expect_err("text diameter");
        assert_eq!(error.placeholder(), "CONFIG.INVALID_TYPE");
    }

    #[test]
    fn defaults_fill_only_absent_keywords() {
        let mut configuration = Configuration::new();
        configuration.set("detector", "binning", 4_u64);
        configuration.set("source", "wavelength", 1.0e-10);

        let merged = configuration.with_defaults();
        let detector = merged.section("detector").expect("detector section");
        assert_eq!(detector.get("binning").and_then(|v| v.as_f64()), Some(4.0));
        assert_eq!(detector.get("noise").and_then(|v| v.as_str()), Some("none"));
        let source = merged.section("source").expect("source section");
        assert!(source.contains("wavelength"));
        assert!(!source.contains("pulse_energy_mean"));
        assert!(merged.optional_section("simulation").is_none());
    }

    #[test]
    fn json_configuration_parses_nested_values() {
        let configuration = Configuration::from_json_str(
            r#"{
                "sample": {
                    "sample_type": "uniform_sphere",
                    "diameter": 1.0e-7,
                    "atomic_composition": {"H": 2, "O": 1},
                    "enabled": true
                }
            }"#,
        )
        .expect("configuration should parse");
        let sample = configuration.section("sample").expect("sample section");
        assert_eq!(
            sample.get("sample_type").and_then(|v| v.as_str()),
            Some("uniform_sphere")
        );
        let composition = sample
            .get("atomic_composition")
            .and_then(|v| v.as_table())
            .expect("composition table");
        assert_eq!(composition.get("H").and_then(|v| v.as_f64()), Some(2.0));

        let error = configuration.section("detector").expect_err("missing section");
        assert_eq!(error.placeholder(), "CONFIG.MISSING_SECTION");
    }

    #[test]
    fn whole_numbers_keep_full_u64_precision() {
        let large = u64::MAX - 1;
        let odd = (1_u64 << 53) + 1;
        let configuration = Configuration::new().with_section(
            "simulation",
            ConfigSection::new().with("large", large).with("odd", odd),
        );
        let json = configuration.to_json_pretty().expect("serializable");
        let reloaded = Configuration::from_json_str(&json).expect("configuration should parse");

        for candidate in [&configuration, &reloaded] {
            let section = candidate.section("simulation").expect("section");
            assert_eq!(section.get("large").and_then(|v| v.as_u64()), Some(large));
            assert_eq!(section.get("odd").and_then(|v| v.as_u64()), Some(odd));
        }
    }

    #[test]
    fn unsigned_values_reject_fractions_and_negatives() {
        let section = ConfigSection::new()
            .with("a", 4.0)
            .with("b", 2.5)
            .with("c", -1.0);
        let checked = CheckedSection {
            name: "simulation",
            section: &section,
        };
        assert_eq!(checked.unsigned("a").expect("whole float"), 4);
        for keyword in ["b", "c"] {
            let error = checked.unsigned(keyword).expect_err("not a count");
            assert_eq!(error.placeholder(), "CONFIG.INVALID_VALUE");
        }
        assert_eq!(checked.optional_unsigned("d").expect("absent"), None);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let mut configuration = Configuration::new();
        configuration.set("plotting", "dpi", 300_u64);
        let error = configuration
            .validate_section_names()
            .expect_err("plotting is not a section");
        assert_eq!(error.placeholder(), "CONFIG.ILLEGAL_SECTION");
    }
}

use crate::domain::{CheckedSection, ConfigResult, KeywordError, SimError, SimResult};
use crate::numerics::linear_grid;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson, Uniform};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Consecutive non-positive random draws tolerated before giving up.
pub const MAX_DRAW_ATTEMPTS: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariationMode {
    #[default]
    None,
    Range,
    Normal,
    Uniform,
    Poisson,
}

impl VariationMode {
    pub const ALL: [VariationMode; 5] = [
        Self::None,
        Self::Range,
        Self::Normal,
        Self::Uniform,
        Self::Poisson,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Range => "range",
            Self::Normal => "normal",
            Self::Uniform => "uniform",
            Self::Poisson => "poisson",
        }
    }

    pub const fn is_random(self) -> bool {
        matches!(self, Self::Normal | Self::Uniform | Self::Poisson)
    }

    const fn needs_spread(self) -> bool {
        matches!(self, Self::Range | Self::Normal | Self::Uniform)
    }
}

impl FromStr for VariationMode {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == name)
            .ok_or_else(|| {
                SimError::configuration(
                    "CONFIG.INVALID_CHOICE",
                    format!(
                        "'{}' is not a variation mode (expected one of: {})",
                        name,
                        Self::ALL.map(Self::as_str).join(", ")
                    ),
                )
            })
    }
}

impl Display for VariationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// The shot-to-shot quantity a [`Variation`] drives. Determines the
/// configuration keywords and the diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariedQuantity {
    PulseEnergy,
    SampleDiameter,
}

impl VariedQuantity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PulseEnergy => "pulse_energy",
            Self::SampleDiameter => "diameter",
        }
    }

    pub const fn mode_keyword(self) -> &'static str {
        match self {
            Self::PulseEnergy => "pulse_energy_variation",
            Self::SampleDiameter => "diameter_variation",
        }
    }

    pub const fn spread_keyword(self) -> &'static str {
        match self {
            Self::PulseEnergy => "pulse_energy_spread",
            Self::SampleDiameter => "diameter_spread",
        }
    }

    pub const fn count_keyword(self) -> &'static str {
        match self {
            Self::PulseEnergy => "pulse_energy_variation_n",
            Self::SampleDiameter => "diameter_variation_n",
        }
    }

    const fn retry_placeholder(self) -> &'static str {
        match self {
            Self::PulseEnergy => "RUN.PULSE_ENERGY_RETRY",
            Self::SampleDiameter => "RUN.DIAMETER_RETRY",
        }
    }
}

/// Per-shot sampler around a mean value.
///
/// `spread` is the full width of the interval for `range` and `uniform` and
/// the standard deviation for `normal`; `poisson` draws around the mean and
/// ignores it.
#[derive(Debug, Clone, PartialEq)]
pub struct Variation {
    quantity: VariedQuantity,
    mode: VariationMode,
    spread: f64,
    steps: Option<usize>,
    position: usize,
}

impl Variation {
    pub fn constant(quantity: VariedQuantity) -> Self {
        Self {
            quantity,
            mode: VariationMode::None,
            spread: 0.0,
            steps: None,
            position: 0,
        }
    }

    pub fn new(
        quantity: VariedQuantity,
        mode: VariationMode,
        spread: Option<f64>,
        steps: Option<usize>,
    ) -> ConfigResult<Self> {
        let spread = match (mode.needs_spread(), spread) {
            (true, None) => {
                return Err(KeywordError::Missing {
                    section: "variation",
                    keywords: vec![quantity.spread_keyword().to_string()],
                }
                .into());
            }
            (_, Some(spread)) if !(spread.is_finite() && spread >= 0.0) => {
                return Err(SimError::configuration(
                    "CONFIG.INVALID_VALUE",
                    format!(
                        "'{}' must be finite and >= 0, got {}",
                        quantity.spread_keyword(),
                        spread
                    ),
                ));
            }
            (_, spread) => spread.unwrap_or(0.0),
        };

        let steps = match (mode, steps) {
            (VariationMode::Range, None | Some(0)) => {
                return Err(SimError::configuration(
                    "CONFIG.INVALID_VALUE",
                    format!(
                        "range variation needs '{}' >= 1",
                        quantity.count_keyword()
                    ),
                ));
            }
            (VariationMode::Range, steps) => steps,
            _ => None,
        };

        Ok(Self {
            quantity,
            mode,
            spread,
            steps,
            position: 0,
        })
    }

    /// Reads `<quantity>_variation`, `<quantity>_spread` and
    /// `<quantity>_variation_n` from an already validated section.
    pub fn from_section(
        section: &CheckedSection<'_>,
        quantity: VariedQuantity,
    ) -> ConfigResult<Self> {
        let mode = match section.optional_text(quantity.mode_keyword())? {
            Some(name) => name.parse::<VariationMode>().map_err(|_| {
                section.invalid_choice(
                    quantity.mode_keyword(),
                    name,
                    &VariationMode::ALL.map(VariationMode::as_str),
                )
            })?,
            None => VariationMode::None,
        };
        let spread = section.optional_number(quantity.spread_keyword())?;
        let steps = section.optional_count(quantity.count_keyword())?;
        Self::new(quantity, mode, spread, steps).map_err(|error| match error.placeholder() {
            "CONFIG.MISSING_KEYWORD" => KeywordError::Missing {
                section: section.name(),
                keywords: vec![quantity.spread_keyword().to_string()],
            }
            .into(),
            _ => error,
        })
    }

    pub fn quantity(&self) -> VariedQuantity {
        self.quantity
    }

    pub fn mode(&self) -> VariationMode {
        self.mode
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }

    /// Returns the next realization around `mean`.
    ///
    /// Deterministic modes fail on a non-positive result. Random modes redraw
    /// up to [`MAX_DRAW_ATTEMPTS`] times.
    pub fn next<R: Rng + ?Sized>(&mut self, mean: f64, rng: &mut R) -> SimResult<f64> {
        if self.mode.is_random() {
            return self.draw_positive(mean, rng);
        }
        let value = match self.mode {
            VariationMode::Range => self.next_in_range(mean)?,
            _ => mean,
        };
        self.ensure_positive(value)
    }

    fn next_in_range(&mut self, mean: f64) -> SimResult<f64> {
        let steps = self.steps.unwrap_or(1);
        let half_width = self.spread / 2.0;
        let grid = linear_grid(mean - half_width, mean + half_width, steps).ok_or_else(|| {
            SimError::internal("SYS.VARIATION_GRID", "range variation has no sweep values")
        })?;
        let value = grid[self.position % steps];
        self.position = (self.position + 1) % steps;
        Ok(value)
    }

    fn draw_positive<R: Rng + ?Sized>(&self, mean: f64, rng: &mut R) -> SimResult<f64> {
        if !mean.is_finite() {
            return self.ensure_positive(mean);
        }
        for attempt in 1..=MAX_DRAW_ATTEMPTS {
            let value = self.draw(mean, rng)?;
            if value > 0.0 {
                return Ok(value);
            }
            tracing::warn!(
                quantity = self.quantity.as_str(),
                mode = self.mode.as_str(),
                attempt,
                value,
                "discarding non-positive draw"
            );
        }

        Err(SimError::computation(
            self.quantity.retry_placeholder(),
            format!(
                "{} {} variation gave {} consecutive non-positive draws around mean {}",
                self.quantity.as_str(),
                self.mode,
                MAX_DRAW_ATTEMPTS,
                mean
            ),
        ))
    }

    fn draw<R: Rng + ?Sized>(&self, mean: f64, rng: &mut R) -> SimResult<f64> {
        let invalid = |detail: String| {
            SimError::configuration(
                "CONFIG.INVALID_VALUE",
                format!("{} {} variation: {}", self.quantity.as_str(), self.mode, detail),
            )
        };
        match self.mode {
            VariationMode::Normal => {
                let distribution =
                    Normal::new(mean, self.spread).map_err(|error| invalid(error.to_string()))?;
                Ok(distribution.sample(rng))
            }
            VariationMode::Uniform => {
                let half_width = self.spread / 2.0;
                let distribution = Uniform::new_inclusive(mean - half_width, mean + half_width);
                Ok(distribution.sample(rng))
            }
            VariationMode::Poisson => {
                let distribution =
                    Poisson::new(mean).map_err(|error| invalid(error.to_string()))?;
                Ok(distribution.sample(rng))
            }
            VariationMode::None | VariationMode::Range => Ok(mean),
        }
    }

    fn ensure_positive(&self, value: f64) -> SimResult<f64> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(SimError::configuration(
                "CONFIG.NON_POSITIVE_VALUE",
                format!(
                    "{} {} variation produced {} (must be > 0)",
                    self.quantity.as_str(),
                    self.mode,
                    value
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_DRAW_ATTEMPTS, Variation, VariationMode, VariedQuantity};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn variation(mode: VariationMode, spread: Option<f64>, steps: Option<usize>) -> Variation {
        Variation::new(VariedQuantity::PulseEnergy, mode, spread, steps).expect("valid variation")
    }

    #[test]
    fn constant_mode_returns_the_mean() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sampler = Variation::constant(VariedQuantity::PulseEnergy);
        assert_eq!(sampler.next(1.0e-3, &mut rng).expect("value"), 1.0e-3);
        assert_eq!(sampler.next(1.0e-3, &mut rng).expect("value"), 1.0e-3);
    }

    #[test]
    fn range_mode_sweeps_and_wraps() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sampler = variation(VariationMode::Range, Some(2.0), Some(3));
        let values: Vec<f64> = (0..5)
            .map(|_| sampler.next(5.0, &mut rng).expect("value"))
            .collect();
        assert_eq!(values, vec![4.0, 5.0, 6.0, 4.0, 5.0]);
    }

    #[test]
    fn deterministic_non_positive_values_are_configuration_errors() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sampler = variation(VariationMode::Range, Some(4.0), Some(2));
        let error = sampler.next(1.0, &mut rng).expect_err("first sweep value is -1");
        assert_eq!(error.placeholder(), "CONFIG.NON_POSITIVE_VALUE");
        assert!(error.is_configuration());

        let mut constant = Variation::constant(VariedQuantity::SampleDiameter);
        assert!(constant.next(0.0, &mut rng).is_err());
    }

    #[test]
    fn random_modes_only_return_positive_values() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut normal = variation(VariationMode::Normal, Some(1.0), None);
        let mut uniform = variation(VariationMode::Uniform, Some(3.0), None);
        for _ in 0..500 {
            assert!(normal.next(0.5, &mut rng).expect("value") > 0.0);
            let value = uniform.next(1.0, &mut rng).expect("value");
            assert!(value > 0.0 && value <= 2.5);
        }
    }

    #[test]
    fn random_draws_are_reproducible_for_a_seed() {
        let mut sampler = variation(VariationMode::Normal, Some(0.1), None);
        let mut first = StdRng::seed_from_u64(5);
        let mut second = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            assert_eq!(
                sampler.next(1.0, &mut first).expect("value"),
                sampler.next(1.0, &mut second).expect("value")
            );
        }
    }

    #[test]
    fn exhausted_retries_are_computation_errors() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sampler = variation(VariationMode::Uniform, Some(1.0), None);
        let error = sampler.next(-10.0, &mut rng).expect_err("no positive support");
        assert_eq!(error.placeholder(), "RUN.PULSE_ENERGY_RETRY");
        assert!(error.message().contains(&MAX_DRAW_ATTEMPTS.to_string()));
    }

    #[test]
    fn spread_and_steps_are_validated() {
        let missing = Variation::new(VariedQuantity::PulseEnergy, VariationMode::Normal, None, None)
            .expect_err("spread is required");
        assert_eq!(missing.placeholder(), "CONFIG.MISSING_KEYWORD");
        let steps =
            Variation::new(VariedQuantity::PulseEnergy, VariationMode::Range, Some(1.0), None)
                .expect_err("steps are required");
        assert_eq!(steps.placeholder(), "CONFIG.INVALID_VALUE");
        assert!(
            Variation::new(VariedQuantity::PulseEnergy, VariationMode::Uniform, Some(-1.0), None)
                .is_err()
        );
        assert!(
            Variation::new(VariedQuantity::PulseEnergy, VariationMode::Poisson, None, None).is_ok()
        );
    }
}

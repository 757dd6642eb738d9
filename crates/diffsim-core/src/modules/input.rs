use super::detector::Detector;
use super::sample::{PropagationResult, Sample};
use super::source::Source;
use crate::common::ElementTables;
use crate::domain::{
    CheckedSection, ConfigResult, ConfigSection, Configuration, DETECTOR_SECTION, FromSection,
    KeywordSpec, SAMPLE_SECTION, SIMULATION_SECTION, SOURCE_SECTION, SimResult, parse_section,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulationSettings {
    pub random_seed: Option<u64>,
}

impl FromSection for SimulationSettings {
    const KEYWORDS: KeywordSpec = KeywordSpec {
        section: SIMULATION_SECTION,
        required: &[],
        optional: &["random_seed"],
    };

    fn from_checked(section: CheckedSection<'_>) -> ConfigResult<Self> {
        Ok(Self {
            random_seed: section.optional_unsigned("random_seed")?,
        })
    }
}

/// Source, sample and detector of one simulation, built once from a
/// configuration merged over the defaults.
#[derive(Debug, Clone)]
pub struct Input {
    configuration: Configuration,
    source: Source,
    sample: Sample,
    detector: Detector,
    seed: u64,
    rng: StdRng,
}

impl Input {
    pub fn new(configuration: &Configuration, tables: &ElementTables) -> SimResult<Self> {
        let configuration = configuration.with_defaults();
        configuration.validate_section_names()?;

        let detector = parse_section::<Detector>(configuration.section(DETECTOR_SECTION)?)?;
        let source = parse_section::<Source>(configuration.section(SOURCE_SECTION)?)?;
        let sample = Sample::from_section(configuration.section(SAMPLE_SECTION)?, &source, tables)?;
        let empty = ConfigSection::new();
        let simulation = parse_section::<SimulationSettings>(
            configuration
                .optional_section(SIMULATION_SECTION)
                .unwrap_or(&empty),
        )?;

        let seed = match simulation.random_seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                tracing::info!(seed, "no random_seed configured, drew one from entropy");
                seed
            }
        };
        tracing::debug!(
            seed,
            sample_type = %sample.sample_type(),
            images = sample.number_of_images(),
            "simulation input ready"
        );

        Ok(Self {
            configuration,
            source,
            sample,
            detector,
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// The configuration after merging with the defaults.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn propagate(&mut self) -> SimResult<PropagationResult> {
        self.sample
            .propagate(&mut self.source, &self.detector, &mut self.rng)
    }
}

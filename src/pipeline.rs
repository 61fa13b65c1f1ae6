//! Pipeline orchestration
//!
//! Public entry points tying the stages together:
//!
//! - Aggregation: keystroke table text → cohort model document
//! - Synthesis: model document + prompts → synthetic sequences per cohort

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::aggregator::Aggregator;
use crate::config::SynthesisConfig;
use crate::error::SimError;
use crate::schema::{models_to_json, parse_models, validate_models, ObservationTable};
use crate::synthesizer::Synthesizer;
use crate::types::{Cohort, CohortModels, CohortSequences, SimulationSet, SyntheticKeyEvent};

/// Reference prompts: pangrams, medium sentences and long passages
pub const DEFAULT_PROMPTS: [&str; 19] = [
    // Short
    "the quick brown fox jumps over the lazy dog",
    "pack my box with five dozen liquor jugs",
    "how vexingly quick daft zebras jump",
    "sphinx of black quartz judge my vow",
    "the five boxing wizards jump quickly",
    "jackdaws love my big sphinx of quartz",
    "two driven jocks help fax my big quiz",
    "five quacking zephyrs jolt my wax bed",
    // Medium
    "the job requires extra pluck and zeal from every young wage earner who wants to succeed in business",
    "modern technology has revolutionized the way we communicate and share information across the globe in recent decades",
    "scientists continue to make remarkable discoveries about the universe while exploring new frontiers in space and medicine",
    "artificial intelligence and machine learning are transforming industries by automating complex tasks and improving efficiency worldwide",
    "climate change poses significant challenges that require immediate action from governments and individuals working together for solutions",
    "digital transformation has changed how businesses operate by integrating advanced technologies into their daily operations and strategies",
    // Long
    "the advancement of medical research has led to breakthrough treatments for previously incurable diseases while simultaneously raising ethical questions about genetic engineering and the future of human enhancement technologies",
    "sustainable energy solutions including solar wind and hydroelectric power are becoming increasingly important as countries worldwide work to reduce carbon emissions and combat the effects of global warming",
    "social media platforms have fundamentally altered human communication patterns by creating new forms of interaction while also presenting challenges related to privacy misinformation and mental health in modern society",
    "educational institutions are adapting to digital learning environments by implementing innovative teaching methods and technologies that enhance student engagement and accessibility to knowledge from anywhere in the world",
    "economic inequality continues to grow in many developed nations as technological automation replaces traditional jobs while creating new opportunities that often require advanced skills and specialized training programs",
];

/// Encoding of the canonical keystroke table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// One JSON observation per line
    Ndjson,
    /// A single JSON array
    Json,
}

/// Build the cohort model document from keystroke table text (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let model_json = aggregate_to_json(&table, TableFormat::Ndjson, true)?;
/// ```
pub fn aggregate_to_json(table: &str, format: TableFormat, pretty: bool) -> Result<String, SimError> {
    // Stage 1: Parse table; blank input is an empty table in either format
    let rows = match format {
        _ if table.trim().is_empty() => Vec::new(),
        TableFormat::Ndjson => ObservationTable::parse_ndjson(table)?,
        TableFormat::Json => ObservationTable::parse_array(table)?,
    };

    // Stage 2: Aggregate per cohort
    let models = Aggregator::build(&rows);

    // Stage 3: Encode model document
    models_to_json(&models, pretty)
}

/// Synthesizer front end over a loaded model document.
///
/// The models are never mutated after construction, so one simulator can be
/// shared by reference across any number of synthesis calls.
#[derive(Debug, Clone)]
pub struct TypingSimulator {
    models: CohortModels,
    config: SynthesisConfig,
}

impl TypingSimulator {
    /// Wrap already-built models with the default calibration
    pub fn new(models: CohortModels) -> Result<Self, SimError> {
        Self::with_config(models, SynthesisConfig::default())
    }

    /// Wrap already-built models with a custom calibration
    pub fn with_config(models: CohortModels, config: SynthesisConfig) -> Result<Self, SimError> {
        validate_models(&models)?;
        config.validate()?;
        Ok(Self { models, config })
    }

    /// Load a persisted model document
    pub fn from_model_json(json: &str) -> Result<Self, SimError> {
        Self::new(parse_models(json)?)
    }

    /// Replace the calibration
    pub fn set_config(&mut self, config: SynthesisConfig) -> Result<(), SimError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn models(&self) -> &CohortModels {
        &self.models
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthesize one prompt for one cohort with the caller's random source
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        text: &str,
        cohort: Cohort,
        rng: &mut R,
    ) -> Result<Vec<SyntheticKeyEvent>, SimError> {
        Synthesizer::new(cohort, self.models.get(cohort), self.config.params(cohort))?
            .synthesize(text, rng)
    }

    /// Synthesize every prompt for every requested cohort.
    ///
    /// Each (prompt, cohort) pair draws from its own generator, seeded from
    /// `master` in iteration order, so a fixed master seed reproduces the
    /// whole set.
    pub fn simulate_prompts_with_rng<R: Rng>(
        &self,
        prompts: &[&str],
        cohorts: &[Cohort],
        master: &mut R,
    ) -> Result<SimulationSet, SimError> {
        let mut set = SimulationSet::new();

        for prompt in prompts {
            let mut sequences = CohortSequences::default();
            for &cohort in cohorts {
                let mut rng = StdRng::from_rng(master);
                sequences.set(cohort, self.synthesize(prompt, cohort, &mut rng)?);
            }
            set.insert((*prompt).to_string(), sequences);
        }

        info!(prompts = set.len(), cohorts = cohorts.len(), "simulated prompts");
        Ok(set)
    }

    /// Synthesize every prompt for every requested cohort from a master seed
    pub fn simulate_prompts(
        &self,
        prompts: &[&str],
        cohorts: &[Cohort],
        seed: u64,
    ) -> Result<SimulationSet, SimError> {
        let mut master = StdRng::seed_from_u64(seed);
        self.simulate_prompts_with_rng(prompts, cohorts, &mut master)
    }
}

/// Serialize a simulation set
pub fn simulation_to_json(set: &SimulationSet, pretty: bool) -> Result<String, SimError> {
    if pretty {
        Ok(serde_json::to_string_pretty(set)?)
    } else {
        Ok(serde_json::to_string(set)?)
    }
}

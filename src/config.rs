use crate::model::Environment;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub init: InitConfig,
    #[serde(default)]
    pub env: Environment,
    #[serde(default)]
    pub model: ModelConfig,
    pub output: OutputConfig,
}

/// Initial population.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Initial number of individuals.
    pub population: u64,
    /// Initial frequency of the dominant allele.
    #[serde(default = "default_dominant_allele_freq")]
    pub dominant_allele_freq: f64,
    /// Random seed. Runs without a seed draw one from the OS and are only
    /// reproducible through the seed reported by the engine.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Stochastic model parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Per-season probability of a disease outbreak.
    pub prob_disease: f64,
    /// Per-season probability of a predator invasion.
    pub prob_predation: f64,
    /// Per-season probability of a climate shift.
    pub prob_climate_shift: f64,
    /// Per-season probability of habitat loss.
    pub prob_habitat_loss: f64,
    /// Per-season probability that the mutation channel fires.
    pub prob_mutation: f64,
    /// Fraction of the population moved by a mutation.
    pub mutation_rate: f64,
    /// Half-width of the uniform pollution random walk step.
    pub pollution_step: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            prob_disease: 0.02,
            prob_predation: 0.015,
            prob_climate_shift: 0.008,
            prob_habitat_loss: 0.0,
            prob_mutation: 0.05,
            mutation_rate: 0.005,
            pollution_step: 0.01,
        }
    }
}

/// Run length and output chunking.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of years after which the run is complete.
    pub year_horizon: u32,
    /// Number of years simulated (and written) per history file.
    #[serde(default = "default_years_per_file")]
    pub years_per_file: u32,
}

fn default_dominant_allele_freq() -> f64 {
    0.6
}

fn default_years_per_file() -> u32 {
    50
}

impl Config {
    /// Configuration with default environment and model parameters.
    pub fn new(population: u64, dominant_allele_freq: f64, year_horizon: u32) -> Self {
        Self {
            init: InitConfig {
                population,
                dominant_allele_freq,
                seed: None,
            },
            env: Environment::default(),
            model: ModelConfig::default(),
            output: OutputConfig {
                year_horizon,
                years_per_file: default_years_per_file(),
            },
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.init.seed = Some(seed);
        self
    }

    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_num(self.init.population, 1..=1_000_000_000_000)
            .context("invalid initial population")?;
        check_num(self.init.dominant_allele_freq, 0.0..=1.0)
            .context("invalid initial dominant allele frequency")?;

        check_num(self.env.food_abundance, Environment::FOOD_MIN..=Environment::FOOD_MAX)
            .context("invalid food abundance")?;
        check_num(self.env.pollution, 0.0..=1.0).context("invalid pollution")?;
        check_num(self.env.predator_density, 0.0..=1.0).context("invalid predator density")?;
        check_num(self.env.ph, 0.0..=14.0).context("invalid pH")?;
        check_num(self.env.temperature_amplitude, 0.0..=50.0)
            .context("invalid temperature amplitude")?;
        check_num(self.env.temperature_mean, -50.0..=50.0).context("invalid temperature mean")?;

        check_prob(self.model.prob_disease).context("invalid disease probability")?;
        check_prob(self.model.prob_predation).context("invalid predation probability")?;
        check_prob(self.model.prob_climate_shift).context("invalid climate shift probability")?;
        check_prob(self.model.prob_habitat_loss).context("invalid habitat loss probability")?;
        check_prob(self.model.prob_mutation).context("invalid mutation probability")?;
        check_num(self.model.mutation_rate, 0.0..=0.5).context("invalid mutation rate")?;
        check_num(self.model.pollution_step, 0.0..=0.5).context("invalid pollution step")?;

        check_num(self.output.year_horizon, 1..).context("invalid year horizon")?;
        check_num(self.output.years_per_file, 1..).context("invalid number of years per file")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_prob(prob: f64) -> Result<()> {
    check_num(prob, 0.0..=1.0)
}
